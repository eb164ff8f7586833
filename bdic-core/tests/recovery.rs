use bdic_core::power::{PowerDomain, RailId, sensor_users};
use bdic_core::recovery::RecoveryState;
use bdic_core::sensor::{
    CombinedState, NoopSnapshotSink, PsAlsMachine, SensorAction, SensorRequest, SensorSequencer,
    SensorUser,
};
use bdic_core::wake::WakeCounter;

#[derive(Default)]
struct QuietSequencer {
    actions: Vec<SensorAction>,
}

impl SensorSequencer for QuietSequencer {
    type Error = ();

    fn sensor_power_on(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn sensor_power_off(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn settle(&mut self) {}

    fn apply(&mut self, action: SensorAction) -> Result<(), Self::Error> {
        self.actions.push(action);
        Ok(())
    }
}

#[test]
fn burst_of_requests_schedules_one_pass() {
    let counter = WakeCounter::new();
    let mut state = RecoveryState::new();
    let machine = PsAlsMachine::from_snapshot(bdic_core::sensor::SensorSnapshot {
        ps_on: true,
        als_on: true,
    });

    // K requests arrive before the recovery task starts; only the first
    // takes a hold and schedules.
    let mut scheduled = 0;
    let mut lease = None;
    for _ in 0..5 {
        if state.request(machine.snapshot()) {
            scheduled += 1;
            lease = Some(counter.acquire());
        }
    }
    assert_eq!(scheduled, 1, "the burst must coalesce into one pass");
    assert_eq!(counter.holds(), 1);

    // The pass runs once and clears the flag.
    state.complete();
    drop(lease);
    assert!(!state.is_queued());
    assert!(counter.is_idle());
}

#[test]
fn recovery_restores_the_faulted_configuration() {
    let rail = PowerDomain::seeded(RailId::Sensor, sensor_users::MASK, sensor_users::BACKLIGHT);
    let mut machine = PsAlsMachine::new();
    let mut sequencer = QuietSequencer::default();
    let mut sink = NoopSnapshotSink;

    // PS and ALS were live when the fault fired.
    machine
        .power_manager(SensorUser::Ps, SensorRequest::On, &rail, &mut sequencer, &mut sink)
        .unwrap();
    machine
        .power_manager(SensorUser::Als, SensorRequest::On, &rail, &mut sequencer, &mut sink)
        .unwrap();

    let mut state = RecoveryState::new();
    assert!(state.request(machine.snapshot()));
    let snapshot = state.snapshot();
    assert!(snapshot.ps_on && snapshot.als_on);

    // The pass powers both functions off...
    machine
        .power_manager(SensorUser::Ps, SensorRequest::Off, &rail, &mut sequencer, &mut sink)
        .unwrap();
    machine
        .power_manager(SensorUser::Als, SensorRequest::Off, &rail, &mut sequencer, &mut sink)
        .unwrap();
    assert_eq!(machine.status().combined, CombinedState::PowerOff);

    // ...then re-applies the snapshot.
    for (user, request) in snapshot.restore_requests() {
        machine
            .power_manager(user, request, &rail, &mut sequencer, &mut sink)
            .unwrap();
    }
    state.complete();

    assert_eq!(
        machine.status().combined,
        CombinedState::PsOnAlsOn,
        "the pre-fault configuration must be restored"
    );
    assert!(!state.is_queued());
}

#[test]
fn snapshot_with_nothing_live_restores_nothing() {
    let machine = PsAlsMachine::new();
    let mut state = RecoveryState::new();
    state.request(machine.snapshot());

    assert!(state.snapshot().restore_requests().is_empty());
}
