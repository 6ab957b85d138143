//! Modbus TCP slave
//!
//! [`ModbusServer`] never blocks and owns no thread. The host calls
//! [`ModbusServer::tick`] periodically; each call runs
//!
//! 1. accept: pick up at most one new client
//! 2. service: every client frames, answers and replies to at most one request
//! 3. cleanup: evict idle clients and drop closed ones
//!
//! Register values are published through [`RegisterHandle`], which may be
//! cloned into other threads.
//!
//! # Example
//!
//! ```rust,no_run
//! use modbus_slave::{ModbusServer, ServerConfig};
//! use std::time::Duration;
//!
//! # fn main() -> modbus_slave::ModbusResult<()> {
//! let mut server = ModbusServer::bind(ServerConfig::new().with_port(1502))?;
//! server.registers().set_u16(1, 3, 100, 1234, 0);
//!
//! loop {
//!     server.tick();
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//! # }
//! ```

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use tracing::info;

use crate::clock::{Clock, MonotonicClock};
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::error::ModbusResult;
use crate::liveness::{NoopWatchdog, Watchdog};
use crate::register::RegisterHandle;
use crate::transport::{bind_listener, Acceptor};

/// Poll-driven Modbus TCP slave
pub struct ModbusServer<A: Acceptor = TcpListener> {
    config: ServerConfig,
    connections: ConnectionManager<A>,
    registers: RegisterHandle,
    watchdog: Box<dyn Watchdog>,
}

impl ModbusServer<TcpListener> {
    /// Validate `config` and open the listening socket.
    pub fn bind(config: ServerConfig) -> ModbusResult<Self> {
        config.validate()?;
        let listener = bind_listener(config.socket_addr(), config.backlog)?;
        info!("Modbus slave listening on {}", listener.local_addr()?);
        Ok(Self::with_acceptor(
            config,
            listener,
            Arc::new(MonotonicClock::new()),
        ))
    }

    /// Actual listening address (useful with port 0).
    pub fn local_addr(&self) -> ModbusResult<SocketAddr> {
        Ok(self.connections.acceptor().local_addr()?)
    }
}

impl<A: Acceptor> ModbusServer<A> {
    /// Build a server around any connection source and clock.
    pub fn with_acceptor(config: ServerConfig, acceptor: A, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            connections: ConnectionManager::new(
                acceptor,
                clock.clone(),
                config.max_inactivity_ms,
                config.disable_nagle,
            ),
            registers: RegisterHandle::new(clock),
            watchdog: Box::new(NoopWatchdog),
        }
    }

    /// Feed `watchdog` during long read bursts.
    pub fn with_watchdog(mut self, watchdog: impl Watchdog + 'static) -> Self {
        self.watchdog = Box::new(watchdog);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle for publishing register values
    pub fn registers(&self) -> RegisterHandle {
        self.registers.clone()
    }

    pub fn set_u16(&self, unit: u8, function: u8, address: u16, value: u16, ttl_ms: u32) {
        self.registers.set_u16(unit, function, address, value, ttl_ms);
    }

    pub fn set_i32(&self, unit: u8, function: u8, address: u16, value: i32, ttl_ms: u32) {
        self.registers.set_i32(unit, function, address, value, ttl_ms);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    /// One non-blocking pass: accept, serve, clean up.
    pub fn tick(&mut self) {
        self.connections.accept();
        self.connections
            .service(&self.registers, self.watchdog.as_mut());
        self.connections.cleanup();
    }

    /// Close every client connection in both directions.
    pub fn shutdown(&mut self) {
        info!(
            "Shutting down, closing {} clients",
            self.connections.connection_count()
        );
        self.connections.shutdown();
    }

    pub fn dump_config(&self) {
        self.config.dump();
    }
}
