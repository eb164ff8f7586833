//! Combined-state transition table for the PS/ALS power machine.

use super::{CombinedState, SensorRequest, SensorUser};

/// Hardware sequence a transition asks the sequencer to run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorAction {
    /// Configure and start the proximity sensor.
    EnablePs,
    /// Stop the proximity sensor.
    DisablePs,
    /// Configure and start continuous ambient-light measurement.
    EnableAls,
    /// Stop ambient-light measurement.
    DisableAls,
    /// One-shot ALS calibration followed by continuous measurement.
    CalibrateAls,
}

/// Looks up the transition for `(user, request)` from `current`.
///
/// `None` means the table has no entry for the current state and the request
/// is a no-op leaving the state unchanged. PS treats `Init` as `On`; the
/// proximity sensor has no separate calibration pass.
pub const fn transition(
    user: SensorUser,
    request: SensorRequest,
    current: CombinedState,
) -> Option<(CombinedState, SensorAction)> {
    use CombinedState::{PowerOff, PowerOn, PsOffAlsOn, PsOnAlsOff, PsOnAlsOn};

    match (user, request) {
        (SensorUser::Ps, SensorRequest::Init | SensorRequest::On) => match current {
            PowerOff | PowerOn => Some((PsOnAlsOff, SensorAction::EnablePs)),
            PsOffAlsOn => Some((PsOnAlsOn, SensorAction::EnablePs)),
            PsOnAlsOff | PsOnAlsOn => None,
        },
        (SensorUser::Ps, SensorRequest::Off) => match current {
            PsOnAlsOff => Some((PowerOff, SensorAction::DisablePs)),
            PsOnAlsOn => Some((PsOffAlsOn, SensorAction::DisablePs)),
            PowerOff | PowerOn | PsOffAlsOn => None,
        },
        (SensorUser::Als, SensorRequest::Init) => match current {
            PowerOff | PowerOn => Some((PsOffAlsOn, SensorAction::CalibrateAls)),
            PsOnAlsOff => Some((PsOnAlsOn, SensorAction::CalibrateAls)),
            PsOffAlsOn | PsOnAlsOn => None,
        },
        (SensorUser::Als, SensorRequest::On) => match current {
            PowerOff | PowerOn => Some((PsOffAlsOn, SensorAction::EnableAls)),
            PsOnAlsOff => Some((PsOnAlsOn, SensorAction::EnableAls)),
            PsOffAlsOn | PsOnAlsOn => None,
        },
        (SensorUser::Als, SensorRequest::Off) => match current {
            PowerOn | PsOffAlsOn => Some((PowerOff, SensorAction::DisableAls)),
            PsOnAlsOn => Some((PsOnAlsOff, SensorAction::DisableAls)),
            PowerOff | PsOnAlsOff => None,
        },
    }
}
