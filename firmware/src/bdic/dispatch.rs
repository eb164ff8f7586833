//! Subscription handling and the two deferred interrupt stages.
//!
//! The runtime tasks own the waiting and the logging; everything here is
//! the lock choreography, kept synchronous so it runs identically on the
//! target and in host tests. Callbacks are always invoked with every lock
//! released.

use bdic_core::error::DriverError;
use bdic_core::irq::IrqKind;
use bdic_core::irq::factors::{LatchOutcome, factor, irq_kind_for, latch_pass};

use super::{FactorLock, IrqCallback, LineGates, RegistryLock, SensorCore};
use crate::hw::bus::{BusError, RegisterBus};

#[cfg(target_os = "none")]
fn log_factor_overflow(dropped: usize) {
    defmt::warn!("irq: factor queue full, dropped {} events", dropped);
}

#[cfg(not(target_os = "none"))]
fn log_factor_overflow(dropped: usize) {
    println!("irq: factor queue full, dropped {dropped} events");
}

/// Installs a subscriber and applies the resulting gate changes.
pub fn subscribe(
    registry: &RegistryLock,
    gates: &LineGates,
    kind: IrqKind,
    callback: IrqCallback,
) -> Result<(), DriverError> {
    let update = registry.lock(|cell| cell.borrow_mut().subscribe(kind, callback))?;
    gates.apply(update);
    Ok(())
}

/// Removes a subscriber and applies the resulting gate changes.
pub fn unsubscribe(
    registry: &RegistryLock,
    gates: &LineGates,
    kind: IrqKind,
) -> Result<(), DriverError> {
    let update = registry.lock(|cell| cell.borrow_mut().unsubscribe(kind))?;
    gates.apply(update);
    Ok(())
}

/// One top-half pass: latch the pending factor bits, enumerate them into
/// the FIFO, and acknowledge the latch.
///
/// Runs with the sequencer lock held. The caller schedules the bottom half
/// and re-enables the line per the returned [`LatchOutcome`].
pub fn top_half_pass<B: RegisterBus>(
    core: &mut SensorCore<B>,
    factors: &FactorLock,
) -> Result<LatchOutcome, BusError> {
    let bits = core.sequencer.read_factors()?;
    let outcome = factors.lock(|cell| latch_pass(bits, &mut cell.borrow_mut()));
    if outcome.dropped > 0 {
        log_factor_overflow(outcome.dropped);
    }
    if !bits.is_empty() {
        core.sequencer.clear_factors(bits)?;
    }
    Ok(outcome)
}

/// Appends the periodic ambient-light report factor.
///
/// The poll timer has no hardware latch to acknowledge, so the report
/// enters the pipeline at the FIFO.
pub fn enqueue_als_report(factors: &FactorLock) -> Result<(), DriverError> {
    factors.lock(|cell| cell.borrow_mut().push(factor::ALS_REPORT))
}

/// One bottom-half drain: dispatch every queued factor, coalescing
/// duplicates, and report how many callbacks ran.
///
/// Each node is popped under the factor lock and its callback looked up
/// under the registry lock; the invocation itself happens with neither
/// held, so a callback may subscribe, unsubscribe, or request recovery.
pub fn drain_bottom_half(factors: &FactorLock, registry: &RegistryLock) -> usize {
    let mut dispatched = 0;
    loop {
        let Some(code) = factors.lock(|cell| cell.borrow_mut().pop_coalesced()) else {
            return dispatched;
        };
        let Some(kind) = irq_kind_for(code) else {
            // Latched by hardware but unknown to the driver; nothing to call.
            continue;
        };
        let callback = registry.lock(|cell| cell.borrow().lookup(kind));
        if let Some(callback) = callback {
            callback(kind);
            dispatched += 1;
        }
    }
}
