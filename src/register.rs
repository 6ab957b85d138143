//! # Register Store
//!
//! Time-aware cache mapping `(unit, function, address)` to a 16-bit value.
//!
//! Values are pushed in by the embedding application and read back by the
//! protocol path. Each value may carry a TTL; once it elapses the entry stays
//! in the map but every lookup treats it as absent.
//!
//! ## Multi-register values
//!
//! 32-bit values are split low word first:
//!
//! | Address | Content |
//! |---------|---------|
//! | `a` | bits 0..16 |
//! | `a + 1` | bits 16..32 |
//!
//! Masters reading these values must use word-swapped (CDAB) decoding.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::clock::Clock;
use crate::constants::{FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS};
use crate::error::RegisterError;

/// Unique key of one 16-bit register.
///
/// Ordered by unit, then function, then address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterKey {
    pub unit: u8,
    pub function: u8,
    pub address: u16,
}

impl RegisterKey {
    #[inline]
    pub const fn new(unit: u8, function: u8, address: u16) -> Self {
        Self {
            unit,
            function,
            address,
        }
    }
}

/// Stored value plus its absolute expiry instant (`None` = never).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterEntry {
    pub value: u16,
    pub expires_at: Option<u64>,
}

impl RegisterEntry {
    /// Usable while `expires_at` is unset or still in the future.
    #[inline]
    pub fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at.map_or(true, |at| at > now_ms)
    }
}

/// The register cache itself. Not synchronized; see [`RegisterHandle`].
pub struct RegisterStore {
    registers: BTreeMap<RegisterKey, RegisterEntry>,
    clock: Arc<dyn Clock>,
}

impl RegisterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registers: BTreeMap::new(),
            clock,
        }
    }

    fn expiration(&self, ttl_ms: u32) -> Option<u64> {
        if ttl_ms == 0 {
            None
        } else {
            Some(self.clock.now_ms() + u64::from(ttl_ms))
        }
    }

    /// Store one register. `ttl_ms == 0` never expires.
    pub fn set_u16(&mut self, unit: u8, function: u8, address: u16, value: u16, ttl_ms: u32) {
        let expires_at = self.expiration(ttl_ms);
        self.registers.insert(
            RegisterKey::new(unit, function, address),
            RegisterEntry { value, expires_at },
        );
    }

    /// Store a signed 32-bit value across `address` (low word) and
    /// `address + 1` (high word), sharing one expiry.
    pub fn set_i32(&mut self, unit: u8, function: u8, address: u16, value: i32, ttl_ms: u32) {
        self.set_u32(unit, function, address, value as u32, ttl_ms);
    }

    /// Unsigned variant of [`set_i32`](Self::set_i32), same word order.
    pub fn set_u32(&mut self, unit: u8, function: u8, address: u16, value: u32, ttl_ms: u32) {
        let expires_at = self.expiration(ttl_ms);
        self.registers.insert(
            RegisterKey::new(unit, function, address),
            RegisterEntry {
                value: (value & 0xFFFF) as u16,
                expires_at,
            },
        );
        self.registers.insert(
            RegisterKey::new(unit, function, address.wrapping_add(1)),
            RegisterEntry {
                value: (value >> 16) as u16,
                expires_at,
            },
        );
    }

    /// Store the IEEE-754 bit pattern of `value`, low word first.
    pub fn set_f32(&mut self, unit: u8, function: u8, address: u16, value: f32, ttl_ms: u32) {
        self.set_u32(unit, function, address, value.to_bits(), ttl_ms);
    }

    /// Look up one register.
    ///
    /// `is_primary` only controls whether a missing address is logged;
    /// secondary misses in a multi-register read are expected and stay quiet.
    pub fn get(
        &self,
        unit: u8,
        function: u8,
        address: u16,
        is_primary: bool,
    ) -> Result<u16, RegisterError> {
        if function != FC_READ_HOLDING_REGISTERS && function != FC_READ_INPUT_REGISTERS {
            warn!("Function {:#04X} not available", function);
            return Err(RegisterError::UnsupportedFunction);
        }

        let Some(entry) = self
            .registers
            .get(&RegisterKey::new(unit, function, address))
        else {
            if is_primary {
                warn!("Address {:#06X} not available", address);
            }
            return Err(RegisterError::NotFound);
        };

        let now = self.clock.now_ms();
        if entry.is_live(now) {
            Ok(entry.value)
        } else {
            warn!(
                "Value at address {:#06X} expired {} ms ago",
                address,
                now - entry.expires_at.unwrap_or(now)
            );
            Err(RegisterError::Expired)
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Cloneable, thread-safe handle to a shared [`RegisterStore`].
///
/// Application writers may live on any thread; the server tick takes the
/// same lock for the duration of one request.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use modbus_slave::clock::MonotonicClock;
/// use modbus_slave::register::RegisterHandle;
///
/// let registers = RegisterHandle::new(Arc::new(MonotonicClock::new()));
/// registers.set_i32(1, 3, 10, -2, 0);
/// assert_eq!(registers.get(1, 3, 10), Ok(0xFFFE));
/// assert_eq!(registers.get(1, 3, 11), Ok(0xFFFF));
/// ```
#[derive(Clone)]
pub struct RegisterHandle {
    inner: Arc<Mutex<RegisterStore>>,
}

impl RegisterHandle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegisterStore::new(clock))),
        }
    }

    /// Lock the store. A writer that panicked mid-update cannot leave a
    /// register half-written, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, RegisterStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_u16(&self, unit: u8, function: u8, address: u16, value: u16, ttl_ms: u32) {
        self.lock().set_u16(unit, function, address, value, ttl_ms);
    }

    pub fn set_i32(&self, unit: u8, function: u8, address: u16, value: i32, ttl_ms: u32) {
        self.lock().set_i32(unit, function, address, value, ttl_ms);
    }

    pub fn set_u32(&self, unit: u8, function: u8, address: u16, value: u32, ttl_ms: u32) {
        self.lock().set_u32(unit, function, address, value, ttl_ms);
    }

    pub fn set_f32(&self, unit: u8, function: u8, address: u16, value: f32, ttl_ms: u32) {
        self.lock().set_f32(unit, function, address, value, ttl_ms);
    }

    /// Primary lookup, as a single-register read would perform it.
    pub fn get(&self, unit: u8, function: u8, address: u16) -> Result<u16, RegisterError> {
        self.lock().get(unit, function, address, true)
    }
}
