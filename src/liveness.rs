//! Liveness signal for an external supervisor
//!
//! Hosts that run the tick under a watchdog (task watchdog, systemd
//! `WATCHDOG_USEC`, ...) pass a [`Watchdog`] so long read bursts keep
//! reporting progress.

/// Receives a `feed()` after every read that made progress.
pub trait Watchdog {
    fn feed(&mut self);
}

/// For hosts without a supervisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWatchdog;

impl Watchdog for NoopWatchdog {
    #[inline]
    fn feed(&mut self) {}
}

impl<F: FnMut()> Watchdog for F {
    #[inline]
    fn feed(&mut self) {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_watchdog() {
        let mut count = 0;
        {
            let mut watchdog = || count += 1;
            let dyn_watchdog: &mut dyn Watchdog = &mut watchdog;
            dyn_watchdog.feed();
            dyn_watchdog.feed();
        }
        assert_eq!(count, 2);
    }
}
