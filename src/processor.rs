//! Request processor
//!
//! Turns one complete ADU into the bytes to send back. Validation order:
//!
//! 1. Frame must be a 12-byte read request, otherwise it is dropped unanswered
//! 2. `count > 100` → exception 4
//! 3. `protocol id != 0` → exception 4
//! 4. Primary register lookup failure → exception 1 (function) or 2 (address)
//!
//! Secondary registers that are missing or expired read as `0x0000`.

use bytes::Bytes;
use tracing::{debug, error};

use crate::adu::{AduBuilder, ReadRequest};
use crate::constants::{
    EXCEPTION_SERVER_DEVICE_FAILURE, MAX_READ_COUNT, MODBUS_PROTOCOL_ID, READ_REQUEST_ADU_LEN,
};
use crate::register::RegisterStore;

/// What to do with a completed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Register data for the master
    Data(Bytes),
    /// Modbus exception carrying `code`
    Exception { code: u8, adu: Bytes },
    /// Unsupported frame shape; nothing is sent
    Discard,
}

impl Reply {
    /// Bytes to write, if any
    pub fn adu(&self) -> Option<&Bytes> {
        match self {
            Reply::Data(adu) | Reply::Exception { adu, .. } => Some(adu),
            Reply::Discard => None,
        }
    }
}

/// Answer one complete frame against the register store.
pub fn process(frame: &[u8], registers: &RegisterStore) -> Reply {
    if frame.len() != READ_REQUEST_ADU_LEN {
        error!("Unexpected length {}", frame.len());
        return Reply::Discard;
    }

    let request = match ReadRequest::parse(frame) {
        Ok(request) => request,
        Err(e) => {
            error!("{}", e);
            return Reply::Discard;
        }
    };

    debug!(
        "Transaction {} protocol {} msglen {} unit {} function {} address {:#06X} count {}",
        request.transaction_id,
        request.protocol_id,
        request.length,
        request.unit,
        request.function,
        request.address,
        request.count
    );

    match read_registers(&request, registers) {
        Ok(values) => Reply::Data(AduBuilder::read_response(&request, &values)),
        Err(code) => Reply::Exception {
            code,
            adu: AduBuilder::exception_response(&request, code),
        },
    }
}

/// Resolve every addressed register, or the exception code to send instead.
fn read_registers(request: &ReadRequest, registers: &RegisterStore) -> Result<Vec<u16>, u8> {
    if request.count > MAX_READ_COUNT {
        error!("Count {} > {}", request.count, MAX_READ_COUNT);
        return Err(EXCEPTION_SERVER_DEVICE_FAILURE);
    }

    if request.protocol_id != MODBUS_PROTOCOL_ID {
        error!("Protocol {}", request.protocol_id);
        return Err(EXCEPTION_SERVER_DEVICE_FAILURE);
    }

    let mut values = Vec::with_capacity(usize::from(request.count));
    for (i, address) in request.addresses().enumerate() {
        let primary = i == 0;
        match registers.get(request.unit, request.function, address, primary) {
            Ok(value) => values.push(value),
            Err(e) if primary => return Err(e.exception_code()),
            Err(_) => values.push(0),
        }
    }
    Ok(values)
}
