//! Diagnostic helpers

use std::fmt;

/// Upper-case hex rendering of a byte slice, formatted only when logged.
///
/// ```rust
/// use modbus_slave::utils::HexDump;
///
/// assert_eq!(HexDump(&[0x00, 0x07, 0xD2]).to_string(), "0007D2");
/// ```
#[derive(Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
