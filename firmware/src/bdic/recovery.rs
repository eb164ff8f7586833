//! Bus-fault recovery scheduling and the recovery pass itself.
//!
//! A fault callback runs in bottom-half context and must not touch the bus,
//! so scheduling only captures the live PS/ALS snapshot and arms the flag;
//! the recovery task performs the power cycle under the sequencer lock.

use bdic_core::sensor::{SensorRequest, SensorSnapshot, SensorUser, SnapshotSink};
use bdic_core::wake::WakeCounter;

use super::{RecoveryChannel, RecoveryLock, SensorCore};
use crate::hw::bus::{BusError, RegisterBus};

#[cfg(target_os = "none")]
fn log_pass_scheduled(snapshot: SensorSnapshot) {
    defmt::warn!(
        "recovery: bus fault latched, pass scheduled (ps={} als={})",
        snapshot.ps_on,
        snapshot.als_on
    );
}

#[cfg(not(target_os = "none"))]
fn log_pass_scheduled(snapshot: SensorSnapshot) {
    println!(
        "recovery: bus fault latched, pass scheduled (ps={} als={})",
        snapshot.ps_on, snapshot.als_on
    );
}

#[cfg(target_os = "none")]
fn log_step_failed(step: &str, error: BusError) {
    defmt::warn!("recovery: {=str} failed ({=str})", step, error.as_str());
}

#[cfg(not(target_os = "none"))]
fn log_step_failed(step: &str, error: BusError) {
    println!("recovery: {step} failed ({})", error.as_str());
}

/// Arms a recovery pass and hands the recovery task its wake hold.
///
/// Returns `true` when a pass was scheduled; `false` when one is already
/// outstanding and this fault coalesces into it.
pub fn request_recovery(
    recovery: &RecoveryLock,
    snapshot: SensorSnapshot,
    wake: &'static WakeCounter,
    channel: &RecoveryChannel,
) -> bool {
    let armed = recovery.lock(|cell| cell.borrow_mut().request(snapshot));
    if !armed {
        return false;
    }
    log_pass_scheduled(snapshot);
    // The flag guards the depth-1 channel, so this send cannot find it full.
    channel.try_send(wake.acquire()).is_ok()
}

/// Returns `true` while a pass is armed or running.
pub fn pass_queued(recovery: &RecoveryLock) -> bool {
    recovery.lock(|cell| cell.borrow().is_queued())
}

/// Returns the snapshot captured when the pass was armed.
pub fn armed_snapshot(recovery: &RecoveryLock) -> SensorSnapshot {
    recovery.lock(|cell| cell.borrow().snapshot())
}

/// Clears the outstanding-pass flag once cleanup has run.
pub fn finish_pass(recovery: &RecoveryLock) {
    recovery.lock(|cell| cell.borrow_mut().complete());
}

/// One recovery pass: force both sensor functions off, let the device
/// settle, clear the fault latch, and re-apply the configuration captured
/// at fault time.
///
/// Runs with the sequencer lock held. Every step executes even when an
/// earlier one fails; the first error is reported for logging.
pub fn run_pass<B, K>(
    core: &mut SensorCore<B>,
    snapshot: SensorSnapshot,
    sink: &mut K,
) -> Result<(), BusError>
where
    B: RegisterBus,
    K: SnapshotSink,
{
    let mut first_error = None;

    if core.sensor_rail.is_on() {
        for user in [SensorUser::Ps, SensorUser::Als] {
            let result = core.machine.power_manager(
                user,
                SensorRequest::Off,
                &core.sensor_rail,
                &mut core.sequencer,
                sink,
            );
            note_transition(&mut first_error, "teardown", result);
        }
    }

    core.sequencer.recovery_settle();

    if let Err(err) = core.sequencer.clear_bus_fault() {
        log_step_failed("fault clear", err);
        if first_error.is_none() {
            first_error = Some(err);
        }
    }

    if core.sensor_rail.is_on() {
        for (user, request) in snapshot.restore_requests() {
            let result =
                core.machine
                    .power_manager(user, request, &core.sensor_rail, &mut core.sequencer, sink);
            note_transition(&mut first_error, "restore", result);
        }
    }

    match first_error {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

fn note_transition(
    first_error: &mut Option<BusError>,
    step: &str,
    result: Result<
        bdic_core::sensor::Transition<BusError>,
        bdic_core::error::DriverError<BusError>,
    >,
) {
    let error = match result {
        Ok(transition) => transition.action_error,
        Err(bdic_core::error::DriverError::Bus(err)) => Some(err),
        Err(_) => None,
    };
    if let Some(err) = error {
        log_step_failed(step, err);
        if first_error.is_none() {
            *first_error = Some(err);
        }
    }
}
