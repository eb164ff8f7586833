//! Bus-fault recovery bookkeeping.
//!
//! The bus-fault interrupt can fire in bursts while the fault condition
//! stands; [`RecoveryState`] collapses them into at most one outstanding
//! recovery pass and keeps the [`SensorSnapshot`] captured when the first
//! fault fired, so the pass can restore the PS/ALS configuration that was
//! live before the fault.

use crate::sensor::SensorSnapshot;

/// Upstream consumer told when a recovery pass brackets its measurements.
///
/// Only called when the proximity sensor was active at fault time; the
/// consumer pauses proximity handling for the duration of the pass.
pub trait RecoveryNotifier {
    fn recovery_starting(&mut self);

    fn recovery_complete(&mut self);
}

/// Guards at-most-one outstanding recovery pass.
#[derive(Copy, Clone, Debug, Default)]
pub struct RecoveryState {
    queued: bool,
    snapshot: SensorSnapshot,
}

impl RecoveryState {
    /// Creates idle recovery bookkeeping.
    pub const fn new() -> Self {
        Self {
            queued: false,
            snapshot: SensorSnapshot {
                ps_on: false,
                als_on: false,
            },
        }
    }

    /// Arms a recovery pass.
    ///
    /// Returns `true` when the caller should schedule the recovery task;
    /// `false` when a pass is already queued and this fault coalesces into
    /// it (the earlier snapshot stands).
    pub fn request(&mut self, snapshot: SensorSnapshot) -> bool {
        if self.queued {
            return false;
        }
        self.queued = true;
        self.snapshot = snapshot;
        true
    }

    /// Returns `true` while a pass is queued or running.
    pub const fn is_queued(&self) -> bool {
        self.queued
    }

    /// Returns the PS/ALS configuration captured at fault time.
    pub const fn snapshot(&self) -> SensorSnapshot {
        self.snapshot
    }

    /// Clears the flag once the pass has finished its cleanup, whether or
    /// not every hardware step succeeded.
    pub fn complete(&mut self) {
        self.queued = false;
    }
}
