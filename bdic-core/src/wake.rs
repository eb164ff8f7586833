//! Suspend-blocking reference count shared by the deferred pipelines.

use portable_atomic::{AtomicU32, Ordering};

/// Counted guard preventing system suspend while deferred work is in flight.
///
/// Each pipeline stage holds a [`WakeLease`] for the work it has accepted;
/// the lease travels through the stage channels and releases on drop, so
/// every acquire is balanced when the consuming stage finishes.
#[derive(Debug, Default)]
pub struct WakeCounter {
    holds: AtomicU32,
}

impl WakeCounter {
    /// Creates an idle counter.
    pub const fn new() -> Self {
        Self {
            holds: AtomicU32::new(0),
        }
    }

    /// Takes one hold and returns the lease that releases it on drop.
    pub fn acquire(&self) -> WakeLease<'_> {
        self.holds.fetch_add(1, Ordering::AcqRel);
        WakeLease { counter: self }
    }

    /// Returns the number of outstanding holds.
    pub fn holds(&self) -> u32 {
        self.holds.load(Ordering::Acquire)
    }

    /// Returns `true` when no deferred work is outstanding.
    pub fn is_idle(&self) -> bool {
        self.holds() == 0
    }
}

/// RAII hold on a [`WakeCounter`].
#[derive(Debug)]
pub struct WakeLease<'a> {
    counter: &'a WakeCounter,
}

impl Drop for WakeLease<'_> {
    fn drop(&mut self) {
        self.counter.holds.fetch_sub(1, Ordering::AcqRel);
    }
}
