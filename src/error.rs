//! Error types for the Modbus slave
//!
//! Only startup paths (configuration, binding) surface `ModbusError` to the
//! caller. Once serving, every failure is confined to the connection it
//! happened on.

use std::io;

use thiserror::Error;

use crate::constants::{EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_FUNCTION};

/// Result alias used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid server configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed frame on the wire
    #[error("Frame error: {message}")]
    Frame { message: String },
}

impl ModbusError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a framing error
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }
}

/// Lookup failure reported by the register store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Function code is neither FC03 nor FC04
    #[error("function code not available")]
    UnsupportedFunction,

    /// Nothing was ever stored under the key
    #[error("register address not available")]
    NotFound,

    /// A value was stored but its TTL has elapsed
    #[error("register value expired")]
    Expired,
}

impl RegisterError {
    /// Modbus exception code sent when the primary register fails
    pub fn exception_code(self) -> u8 {
        match self {
            Self::UnsupportedFunction => EXCEPTION_ILLEGAL_FUNCTION,
            Self::NotFound | Self::Expired => EXCEPTION_ILLEGAL_DATA_ADDRESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_error_exception_codes() {
        assert_eq!(RegisterError::UnsupportedFunction.exception_code(), 1);
        assert_eq!(RegisterError::NotFound.exception_code(), 2);
        assert_eq!(RegisterError::Expired.exception_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = ModbusError::frame("read request must be 12 bytes, got 8");
        assert_eq!(err.to_string(), "Frame error: read request must be 12 bytes, got 8");

        let err = ModbusError::config("port must be set");
        assert_eq!(err.to_string(), "Configuration error: port must be set");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        let err: ModbusError = io_err.into();
        assert!(matches!(err, ModbusError::Io(_)));
    }
}
