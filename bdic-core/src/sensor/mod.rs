//! Combined PS/ALS power state machine.
//!
//! The machine owns the [`SensorPowerStatus`] bookkeeping and sequences every
//! proximity/ambient-light power transition through the table in
//! [`transitions`]. Hardware sequences enter through [`SensorSequencer`];
//! committed states are mirrored to a [`SnapshotSink`] for warm-boot
//! continuity.

pub mod transitions;

pub use transitions::{SensorAction, transition};

use heapless::Vec;

use crate::error::DriverError;
use crate::power::PowerDomain;

/// Combined PS/ALS power state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum CombinedState {
    /// Sensor block unpowered, both functions off.
    #[default]
    PowerOff,
    /// Sensor block powered, neither function measuring.
    PowerOn,
    PsOnAlsOff,
    PsOffAlsOn,
    PsOnAlsOn,
}

impl CombinedState {
    /// Returns `true` when the proximity sensor is measuring.
    pub const fn ps_active(self) -> bool {
        matches!(self, CombinedState::PsOnAlsOff | CombinedState::PsOnAlsOn)
    }

    /// Returns `true` when the ambient-light sensor is measuring.
    pub const fn als_active(self) -> bool {
        matches!(self, CombinedState::PsOffAlsOn | CombinedState::PsOnAlsOn)
    }
}

/// Requesting function for a power transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorUser {
    Ps,
    Als,
}

/// Requested power operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorRequest {
    Init,
    On,
    Off,
}

/// Aggregate PS activation state seen by `ps_user_manager`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PsUserState {
    #[default]
    Off,
    On,
}

/// Aggregate ALS activation state seen by `als_user_manager`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AlsUserState {
    #[default]
    Off,
    /// Soft activation: calibrated and measuring, but no full user yet.
    Init,
    On,
}

/// User bits accepted by `als_user_manager`.
pub mod als_users {
    pub const LIGHT_APP: u8 = 1 << 0;
    pub const CAMERA: u8 = 1 << 1;
    pub const KEY_LED: u8 = 1 << 2;

    pub const MASK: u8 = LIGHT_APP | CAMERA | KEY_LED;
}

/// Snapshot persisted for warm-boot continuity and fault recovery.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct SensorSnapshot {
    pub ps_on: bool,
    pub als_on: bool,
}

impl SensorSnapshot {
    /// Captures the measuring functions of a combined state.
    pub const fn of(state: CombinedState) -> Self {
        Self {
            ps_on: state.ps_active(),
            als_on: state.als_active(),
        }
    }

    /// Requests that re-apply this snapshot after a power cycle.
    pub fn restore_requests(self) -> Vec<(SensorUser, SensorRequest), 2> {
        let mut requests = Vec::new();
        if self.ps_on {
            let _ = requests.push((SensorUser::Ps, SensorRequest::On));
        }
        if self.als_on {
            let _ = requests.push((SensorUser::Als, SensorRequest::On));
        }
        requests
    }
}

/// Hardware sequences the state machine drives.
pub trait SensorSequencer {
    /// Bus transaction error type.
    type Error;

    /// Powers the BDIC sensor block on.
    fn sensor_power_on(&mut self) -> Result<(), Self::Error>;

    /// Powers the BDIC sensor block off.
    fn sensor_power_off(&mut self) -> Result<(), Self::Error>;

    /// Fixed settle delay applied after the sensor block powers on.
    fn settle(&mut self);

    /// Runs the init/deinit sequence for one transition.
    fn apply(&mut self, action: SensorAction) -> Result<(), Self::Error>;
}

/// Receives a status snapshot after every committed transition.
pub trait SnapshotSink {
    fn store(&mut self, snapshot: SensorSnapshot);
}

/// Sink for hosts without a boot-context store.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSnapshotSink;

impl SnapshotSink for NoopSnapshotSink {
    fn store(&mut self, _: SensorSnapshot) {}
}

/// Bookkeeping mutated only through the machine's operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct SensorPowerStatus {
    pub combined: CombinedState,
    pub ps_user: PsUserState,
    pub als_user: AlsUserState,
    pub als_users: u8,
}

/// Committed transition whose hardware sequence may have failed.
///
/// A failed action never rolls back the committed state; the caller logs
/// `action_error` and carries on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition<E> {
    pub state: CombinedState,
    pub action_error: Option<E>,
}

impl<E> Transition<E> {
    const fn unchanged(state: CombinedState) -> Self {
        Self {
            state,
            action_error: None,
        }
    }
}

/// The PS/ALS power state machine.
#[derive(Copy, Clone, Debug, Default)]
pub struct PsAlsMachine {
    status: SensorPowerStatus,
}

impl PsAlsMachine {
    /// Creates a machine with everything off.
    pub const fn new() -> Self {
        Self {
            status: SensorPowerStatus {
                combined: CombinedState::PowerOff,
                ps_user: PsUserState::Off,
                als_user: AlsUserState::Off,
                als_users: 0,
            },
        }
    }

    /// Seeds the combined state from a persisted snapshot.
    ///
    /// User-level bookkeeping starts empty; the host boundary re-registers
    /// its users after attach.
    pub const fn from_snapshot(snapshot: SensorSnapshot) -> Self {
        let combined = match (snapshot.ps_on, snapshot.als_on) {
            (false, false) => CombinedState::PowerOff,
            (true, false) => CombinedState::PsOnAlsOff,
            (false, true) => CombinedState::PsOffAlsOn,
            (true, true) => CombinedState::PsOnAlsOn,
        };
        Self {
            status: SensorPowerStatus {
                combined,
                ps_user: if snapshot.ps_on {
                    PsUserState::On
                } else {
                    PsUserState::Off
                },
                als_user: if snapshot.als_on {
                    AlsUserState::On
                } else {
                    AlsUserState::Off
                },
                als_users: 0,
            },
        }
    }

    /// Returns the current bookkeeping.
    pub const fn status(&self) -> SensorPowerStatus {
        self.status
    }

    /// Returns a snapshot of the currently measuring functions.
    pub const fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot::of(self.status.combined)
    }

    /// Sequences one PS/ALS power transition.
    ///
    /// Requires the shared sensor rail to be powered; an absent rail is
    /// benign success. A request with no table entry for the current state
    /// leaves the state unchanged.
    pub fn power_manager<S, K>(
        &mut self,
        user: SensorUser,
        request: SensorRequest,
        rail: &PowerDomain,
        sequencer: &mut S,
        sink: &mut K,
    ) -> Result<Transition<S::Error>, DriverError<S::Error>>
    where
        S: SensorSequencer,
        K: SnapshotSink,
    {
        if !rail.is_present() {
            return Ok(Transition::unchanged(self.status.combined));
        }
        if !rail.is_on() {
            return Err(DriverError::NotReady);
        }

        let current = self.status.combined;
        let Some((next, action)) = transition(user, request, current) else {
            return Ok(Transition::unchanged(current));
        };

        if matches!(current, CombinedState::PowerOff)
            && matches!(request, SensorRequest::Init | SensorRequest::On)
        {
            sequencer.sensor_power_on()?;
            sequencer.settle();
        }

        let mut action_error = sequencer.apply(action).err();

        // Commit before any teardown; the sequence outcome does not gate the
        // state update.
        self.status.combined = next;

        if matches!(next, CombinedState::PowerOff)
            && let Err(err) = sequencer.sensor_power_off()
            && action_error.is_none()
        {
            action_error = Some(err);
        }

        sink.store(SensorSnapshot::of(next));

        Ok(Transition {
            state: next,
            action_error,
        })
    }

    /// Single ON/OFF edge filter in front of `power_manager` for PS.
    pub fn ps_user_manager<S, K>(
        &mut self,
        on: bool,
        rail: &PowerDomain,
        sequencer: &mut S,
        sink: &mut K,
    ) -> Result<Transition<S::Error>, DriverError<S::Error>>
    where
        S: SensorSequencer,
        K: SnapshotSink,
    {
        match (self.status.ps_user, on) {
            (PsUserState::Off, true) => {
                let transition =
                    self.power_manager(SensorUser::Ps, SensorRequest::On, rail, sequencer, sink)?;
                self.status.ps_user = PsUserState::On;
                Ok(transition)
            }
            (PsUserState::On, false) => {
                let transition =
                    self.power_manager(SensorUser::Ps, SensorRequest::Off, rail, sequencer, sink)?;
                self.status.ps_user = PsUserState::Off;
                Ok(transition)
            }
            _ => Ok(Transition::unchanged(self.status.combined)),
        }
    }

    /// Reference-counting wrapper in front of `power_manager` for ALS.
    ///
    /// `On`/`Off` track concurrent user bits; the hardware transition runs
    /// only on the first bit set and the last bit cleared. `Init` is the
    /// soft one-shot calibration activation and tracks no bit.
    pub fn als_user_manager<S, K>(
        &mut self,
        user_bit: u8,
        request: SensorRequest,
        rail: &PowerDomain,
        sequencer: &mut S,
        sink: &mut K,
    ) -> Result<Transition<S::Error>, DriverError<S::Error>>
    where
        S: SensorSequencer,
        K: SnapshotSink,
    {
        match request {
            SensorRequest::Init => {
                let transition = self.power_manager(
                    SensorUser::Als,
                    SensorRequest::Init,
                    rail,
                    sequencer,
                    sink,
                )?;
                if matches!(self.status.als_user, AlsUserState::Off) {
                    self.status.als_user = AlsUserState::Init;
                }
                Ok(transition)
            }
            SensorRequest::On => {
                if user_bit == 0 || user_bit & !als_users::MASK != 0 {
                    return Err(DriverError::Invalid);
                }
                let transition = if self.status.als_users == 0 {
                    self.power_manager(SensorUser::Als, SensorRequest::On, rail, sequencer, sink)?
                } else {
                    Transition::unchanged(self.status.combined)
                };
                self.status.als_users |= user_bit;
                self.status.als_user = AlsUserState::On;
                Ok(transition)
            }
            SensorRequest::Off => {
                if user_bit == 0 || user_bit & !als_users::MASK != 0 {
                    return Err(DriverError::Invalid);
                }
                let remaining = self.status.als_users & !user_bit;
                let transition = if remaining == 0 {
                    self.power_manager(SensorUser::Als, SensorRequest::Off, rail, sequencer, sink)?
                } else {
                    Transition::unchanged(self.status.combined)
                };
                self.status.als_users = remaining;
                if remaining == 0 {
                    self.status.als_user = AlsUserState::Off;
                }
                Ok(transition)
            }
        }
    }
}
