//! # Modbus Slave - Poll-Driven Modbus TCP Register Server
//!
//! **License:** MIT
//!
//! A minimal Modbus TCP slave that answers read requests from an in-memory,
//! TTL-bounded register cache. Designed for gateways that scrape values from
//! somewhere else (a serial bus, a sensor, a REST API) and re-publish them to
//! SCADA masters.
//!
//! ## Features
//!
//! - **No threads, no blocking**: one `tick()` call accepts, frames,
//!   answers and evicts; the host decides how often to call it
//! - **Partial reads**: ADUs are framed incrementally across ticks
//! - **Expiring values**: stale registers are answered with an exception
//!   instead of silently serving old data
//! - **Isolated clients**: a misbehaving master only ever loses its own
//!   connection
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Slave |
//! |------|----------|-------|
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x04 | Read Input Registers | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_slave::{ModbusResult, ModbusServer, ServerConfig};
//! use std::time::Duration;
//!
//! fn main() -> ModbusResult<()> {
//!     let mut server = ModbusServer::bind(ServerConfig::default())?;
//!     let registers = server.registers();
//!
//!     // Publish a temperature that goes stale after 10 s
//!     registers.set_i32(1, 4, 0, -1250, 10_000);
//!
//!     loop {
//!         server.tick();
//!         std::thread::sleep(Duration::from_millis(10));
//!     }
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants
pub mod constants;

/// Millisecond clock abstraction
pub mod clock;

/// TTL-bounded register store
pub mod register;

/// Request parsing and response assembly
pub mod adu;

/// Incremental frame decoder
pub mod decoder;

/// Request validation and response production
pub mod processor;

/// Socket abstraction and listener setup
pub mod transport;

/// Supervisor heartbeat
pub mod liveness;

/// Connection lifecycle management
pub mod connection;

/// Server configuration
pub mod config;

/// Server tick entry point
pub mod server;

/// Diagnostic helpers
pub mod utils;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::ServerConfig;
pub use error::{ModbusError, ModbusResult, RegisterError};
pub use register::{RegisterHandle, RegisterKey, RegisterStore};
pub use server::ModbusServer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use liveness::{NoopWatchdog, Watchdog};
pub use transport::{Acceptor, Transport};

pub use constants::{DEFAULT_MAX_INACTIVITY_MS, DEFAULT_TCP_PORT, MAX_READ_COUNT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Modbus Slave v{} - poll-driven Modbus TCP register server", VERSION)
}
