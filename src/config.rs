//! # Server Configuration
//!
//! Listening endpoint and connection policy for the slave.
//!
//! | Option | Default |
//! |--------|---------|
//! | `bind_address` | `0.0.0.0` |
//! | `port` | `502` |
//! | `max_inactivity_ms` | `300000` |
//! | `disable_nagle` | `true` |
//! | `backlog` | `8` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::info;

use crate::constants::{DEFAULT_LISTEN_BACKLOG, DEFAULT_MAX_INACTIVITY_MS, DEFAULT_TCP_PORT};
use crate::error::{ModbusError, ModbusResult};

/// Modbus slave configuration.
///
/// # Example
///
/// ```rust
/// use modbus_slave::ServerConfig;
///
/// let config = ServerConfig::new()
///     .with_port(1502)
///     .with_max_inactivity_ms(60_000)
///     .with_disable_nagle(false);
///
/// assert_eq!(config.port, 1502);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind_address: IpAddr,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Idle connections are evicted after this many milliseconds.
    pub max_inactivity_ms: u64,
    /// Set `TCP_NODELAY` on accepted sockets.
    pub disable_nagle: bool,
    /// Listen queue length.
    pub backlog: i32,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_inactivity_ms(mut self, ms: u64) -> Self {
        self.max_inactivity_ms = ms;
        self
    }

    pub fn with_disable_nagle(mut self, disable: bool) -> Self {
        self.disable_nagle = disable;
        self
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn validate(&self) -> ModbusResult<()> {
        if self.max_inactivity_ms == 0 {
            return Err(ModbusError::config("max_inactivity_ms must be greater than 0"));
        }
        if self.backlog <= 0 {
            return Err(ModbusError::config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        Ok(())
    }

    /// Log the effective configuration.
    pub fn dump(&self) {
        info!("Modbus slave:");
        info!("  Address: {}", self.bind_address);
        info!("  Port: {}", self.port);
        info!("  Max inactivity: {} ms", self.max_inactivity_ms);
        info!("  TCP_NODELAY: {}", self.disable_nagle);
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_TCP_PORT,
            max_inactivity_ms: DEFAULT_MAX_INACTIVITY_MS,
            disable_nagle: true,
            backlog: DEFAULT_LISTEN_BACKLOG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 502);
        assert_eq!(config.max_inactivity_ms, 300_000);
        assert!(config.disable_nagle);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:502");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new()
            .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_port(0)
            .with_backlog(16)
            .with_disable_nagle(false);

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:0");
        assert_eq!(config.backlog, 16);
        assert!(!config.disable_nagle);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = ServerConfig::new().with_max_inactivity_ms(0).validate();
        assert!(matches!(err, Err(ModbusError::Config { .. })));

        let err = ServerConfig::new().with_backlog(0).validate();
        assert!(matches!(err, Err(ModbusError::Config { .. })));
    }
}
