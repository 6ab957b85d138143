//! Modbus TCP ADU views and response assembly
//!
//! A read request is always 12 bytes:
//!
//! ```text
//! [0:2]  transaction id      [6]     unit id
//! [2:4]  protocol id         [7]     function code
//! [4:6]  following length    [8:10]  start address
//!                            [10:12] register count
//! ```
//!
//! All multi-byte fields are big-endian.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::constants::{
    EXCEPTION_FLAG, EXCEPTION_RESPONSE_LEN, READ_REQUEST_ADU_LEN, READ_RESPONSE_HEADER_LEN,
};
use crate::error::{ModbusError, ModbusResult};

/// Decoded fields of a read request ADU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit: u8,
    pub function: u8,
    pub address: u16,
    pub count: u16,
}

impl ReadRequest {
    /// Split a complete 12-byte ADU into its fields.
    ///
    /// No semantic validation happens here; protocol id and count are
    /// checked by the processor so it can answer with an exception.
    pub fn parse(adu: &[u8]) -> ModbusResult<Self> {
        if adu.len() != READ_REQUEST_ADU_LEN {
            return Err(ModbusError::frame(format!(
                "read request must be {} bytes, got {}",
                READ_REQUEST_ADU_LEN,
                adu.len()
            )));
        }

        let be = |i: usize| u16::from_be_bytes([adu[i], adu[i + 1]]);
        Ok(Self {
            transaction_id: be(0),
            protocol_id: be(2),
            length: be(4),
            unit: adu[6],
            function: adu[7],
            address: be(8),
            count: be(10),
        })
    }

    /// Addresses covered by the request, primary first.
    ///
    /// Computed in `u32` so a range running past 0xFFFF wraps per address
    /// instead of overflowing.
    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        let start = u32::from(self.address);
        (start..start + u32::from(self.count)).map(|a| a as u16)
    }
}

/// Fluent builder for response ADUs
pub struct AduBuilder {
    buf: BytesMut,
}

impl AduBuilder {
    /// Start a response echoing the request's transaction and protocol ids.
    ///
    /// `following` is the value of the MBAP length field.
    #[inline]
    pub fn new(transaction_id: u16, protocol_id: u16, following: u16) -> Self {
        let mut buf = BytesMut::with_capacity(6 + usize::from(following));
        buf.put_u16(transaction_id);
        buf.put_u16(protocol_id);
        buf.put_u16(following);
        Self { buf }
    }

    #[inline]
    pub fn byte(mut self, b: u8) -> Self {
        self.buf.put_u8(b);
        self
    }

    #[inline]
    pub fn register(mut self, value: u16) -> Self {
        self.buf.put_u16(value);
        self
    }

    #[inline]
    pub fn build(self) -> Bytes {
        self.buf.freeze()
    }

    /// Success response for FC03/FC04: `9 + 2 * values.len()` bytes.
    pub fn read_response(request: &ReadRequest, values: &[u16]) -> Bytes {
        let data_len = values.len() * 2;
        let mut builder = AduBuilder::new(
            request.transaction_id,
            request.protocol_id,
            (3 + data_len) as u16,
        )
        .byte(request.unit)
        .byte(request.function)
        .byte(data_len as u8);

        for &value in values {
            builder = builder.register(value);
        }

        let adu = builder.build();
        debug_assert_eq!(adu.len(), READ_RESPONSE_HEADER_LEN + data_len);
        adu
    }

    /// Exception response: function code with the high bit set plus a
    /// one-byte exception code.
    pub fn exception_response(request: &ReadRequest, exception_code: u8) -> Bytes {
        debug!(
            "Building exception {:#04X} for FC={:#04X}",
            exception_code, request.function
        );
        let adu = AduBuilder::new(request.transaction_id, request.protocol_id, 3)
            .byte(request.unit)
            .byte(request.function | EXCEPTION_FLAG)
            .byte(exception_code)
            .build();
        debug_assert_eq!(adu.len(), EXCEPTION_RESPONSE_LEN);
        adu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(transaction_id: u16, unit: u8, function: u8, address: u16, count: u16) -> ReadRequest {
        ReadRequest {
            transaction_id,
            protocol_id: 0,
            length: 6,
            unit,
            function,
            address,
            count,
        }
    }

    #[test]
    fn test_parse_read_request() {
        let adu = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x64, 0x00, 0x01];
        let req = ReadRequest::parse(&adu).unwrap();
        assert_eq!(req, request(7, 1, 3, 100, 1));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = ReadRequest::parse(&[0u8; 11]).unwrap_err();
        assert!(matches!(err, ModbusError::Frame { .. }));
    }

    #[test]
    fn test_addresses_wrap_at_top_of_range() {
        let req = request(1, 1, 3, 0xFFFE, 3);
        let addrs: Vec<u16> = req.addresses().collect();
        assert_eq!(addrs, vec![0xFFFE, 0xFFFF, 0x0000]);
        assert_eq!(request(1, 1, 3, 5, 0).addresses().count(), 0);
    }

    #[test]
    fn test_read_response_layout() {
        let adu = AduBuilder::read_response(&request(7, 1, 3, 100, 1), &[1234]);
        assert_eq!(&adu[..], &[0, 7, 0, 0, 0, 5, 1, 3, 2, 0x04, 0xD2]);
    }

    #[test]
    fn test_read_response_multiple_registers() {
        let adu = AduBuilder::read_response(&request(0x0102, 9, 4, 0, 3), &[0x0A0B, 0, 0xFFFF]);
        assert_eq!(adu.len(), 9 + 2 * 3);
        assert_eq!(&adu[..9], &[0x01, 0x02, 0, 0, 0, 9, 9, 4, 6]);
        assert_eq!(&adu[9..], &[0x0A, 0x0B, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_exception_response_layout() {
        let adu = AduBuilder::exception_response(&request(7, 5, 3, 999, 1), 2);
        assert_eq!(&adu[..], &[0, 7, 0, 0, 0, 3, 5, 0x83, 0x02]);
    }
}
