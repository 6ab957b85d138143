//! Incremental Modbus TCP frame decoder
//!
//! Each connection owns one [`FrameDecoder`]. Every tick it pulls whatever
//! the socket has ready into a fixed receive buffer and reports how far the
//! current ADU got:
//!
//! ```text
//!   AwaitingHeader ──(6 bytes)──► AwaitingBody ──(6 + len bytes)──► Complete
//!         ▲                                                             │
//!         └──────────────────────────── reset() ◄───────────────────────┘
//! ```
//!
//! A read that would block leaves the buffer as is; the next tick resumes
//! exactly where this one stopped.

use std::fmt;
use std::io::{self, Read};

use crate::constants::{MAX_BODY_LEN, MBAP_HEADER_LEN, RECEIVE_BUFFER_SIZE};
use crate::liveness::Watchdog;

/// Which part of the ADU is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Header,
    Body,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Header => f.write_str("header"),
            Phase::Body => f.write_str("message"),
        }
    }
}

/// Outcome of one [`FrameDecoder::poll`]
#[derive(Debug)]
pub enum DecodeStatus {
    /// Socket has nothing more right now; try again next tick
    Pending,
    /// A full ADU of the given length sits in the buffer
    Complete(usize),
    /// Peer performed an orderly shutdown
    PeerClosed(Phase),
    /// Declared body length exceeds [`MAX_BODY_LEN`]
    Oversized(usize),
    /// Non-transient read failure
    Failed(Phase, io::Error),
}

/// Per-connection receive state
pub struct FrameDecoder {
    buffer: [u8; RECEIVE_BUFFER_SIZE],
    filled: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: [0; RECEIVE_BUFFER_SIZE],
            filled: 0,
        }
    }

    /// Bytes of the current ADU received so far
    #[inline]
    pub fn filled(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        if self.filled < MBAP_HEADER_LEN {
            Phase::Header
        } else {
            Phase::Body
        }
    }

    /// The received bytes of the current ADU
    #[inline]
    pub fn frame(&self) -> &[u8] {
        &self.buffer[..self.filled]
    }

    /// Drop the current ADU and start framing the next one
    #[inline]
    pub fn reset(&mut self) {
        self.filled = 0;
    }

    /// Declared MBAP length, once the header is in
    fn body_len(&self) -> Option<usize> {
        (self.filled >= MBAP_HEADER_LEN)
            .then(|| usize::from(u16::from_be_bytes([self.buffer[4], self.buffer[5]])))
    }

    /// Advance framing as far as the socket allows without blocking.
    ///
    /// The watchdog is fed after every read that returned data, so a long
    /// burst of small segments never starves the supervisor.
    pub fn poll<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        watchdog: &mut dyn Watchdog,
    ) -> DecodeStatus {
        if self.filled < MBAP_HEADER_LEN {
            if let Some(status) = self.fill_to(MBAP_HEADER_LEN, Phase::Header, reader, watchdog) {
                return status;
            }
        }

        let body_len = match self.body_len() {
            Some(len) if len > MAX_BODY_LEN => return DecodeStatus::Oversized(len),
            Some(len) => len,
            None => return DecodeStatus::Pending,
        };

        let target = MBAP_HEADER_LEN + body_len;
        if self.filled < target {
            if let Some(status) = self.fill_to(target, Phase::Body, reader, watchdog) {
                return status;
            }
        }

        DecodeStatus::Complete(self.filled)
    }

    /// Read until `filled == target`. Returns `None` once the target is
    /// reached, otherwise the status that stopped the loop.
    fn fill_to<R: Read + ?Sized>(
        &mut self,
        target: usize,
        phase: Phase,
        reader: &mut R,
        watchdog: &mut dyn Watchdog,
    ) -> Option<DecodeStatus> {
        while self.filled < target {
            match reader.read(&mut self.buffer[self.filled..target]) {
                Ok(0) => return Some(DecodeStatus::PeerClosed(phase)),
                Ok(n) => {
                    self.filled += n;
                    watchdog.feed();
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Some(DecodeStatus::Pending)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(DecodeStatus::Failed(phase, e)),
            }
        }
        None
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
