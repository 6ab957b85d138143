//! Modbus TCP constants used by the slave
//!
//! Sizes and limits follow the Modbus application protocol, narrowed to the
//! read-only subset this slave answers:
//! - Only FC03/FC04 read requests are framed, always 12 bytes on the wire
//! - Declared MBAP body length and register count are both capped at 100

// ============================================================================
// Frame Size Constants
// ============================================================================

/// MBAP prefix length: Transaction ID(2) + Protocol ID(2) + Length(2)
///
/// The unit id that completes the 7-byte MBAP header is counted as part of
/// the body, because the length field covers it.
pub const MBAP_HEADER_LEN: usize = 6;

/// Per-connection receive buffer capacity (max Modbus TCP ADU length)
///
/// = 6 (MBAP prefix) + 254 (max MBAP length: Unit ID + 253 byte PDU)
pub const RECEIVE_BUFFER_SIZE: usize = 260;

/// Largest declared MBAP body length accepted before the connection is dropped
pub const MAX_BODY_LEN: usize = 100;

/// Body length of a read request: Unit(1) + FC(1) + Address(2) + Count(2)
pub const READ_REQUEST_BODY_LEN: usize = 6;

/// Full read request ADU length
pub const READ_REQUEST_ADU_LEN: usize = MBAP_HEADER_LEN + READ_REQUEST_BODY_LEN;

/// Exception response length: Prefix(6) + Unit(1) + FC|0x80(1) + Exception(1)
///
/// Matches the length field value of 3 carried in the prefix.
pub const EXCEPTION_RESPONSE_LEN: usize = 9;

/// Fixed part of a read response: prefix(6) + unit(1) + fc(1) + byte count(1)
pub const READ_RESPONSE_HEADER_LEN: usize = 9;

/// Only the standard Modbus protocol identifier is served
pub const MODBUS_PROTOCOL_ID: u16 = 0;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers answered in a single FC03/FC04 request
///
/// Stricter than the protocol limit of 125 so a response always fits in
/// 9 + 2 * 100 = 209 bytes.
pub const MAX_READ_COUNT: u16 = 100;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// High bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Server Device Failure
pub const EXCEPTION_SERVER_DEVICE_FAILURE: u8 = 0x04;

// ============================================================================
// Server Defaults
// ============================================================================

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Idle connections are evicted after 5 minutes
pub const DEFAULT_MAX_INACTIVITY_MS: u64 = 300_000;

/// Listen backlog for the server socket
pub const DEFAULT_LISTEN_BACKLOG: i32 = 8;
