use bdic_core::power::{PowerDomain, RailId, sensor_users};
use bdic_core::sensor::{
    CombinedState, NoopSnapshotSink, PsAlsMachine, SensorAction, SensorRequest, SensorSequencer,
    SensorSnapshot, SensorUser, SnapshotSink, als_users,
};

#[derive(Default)]
struct ScriptedSequencer {
    power_ons: usize,
    power_offs: usize,
    actions: Vec<SensorAction>,
}

impl SensorSequencer for ScriptedSequencer {
    type Error = ();

    fn sensor_power_on(&mut self) -> Result<(), Self::Error> {
        self.power_ons += 1;
        Ok(())
    }

    fn sensor_power_off(&mut self) -> Result<(), Self::Error> {
        self.power_offs += 1;
        Ok(())
    }

    fn settle(&mut self) {}

    fn apply(&mut self, action: SensorAction) -> Result<(), Self::Error> {
        self.actions.push(action);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    snapshots: Vec<SensorSnapshot>,
}

impl SnapshotSink for RecordingSink {
    fn store(&mut self, snapshot: SensorSnapshot) {
        self.snapshots.push(snapshot);
    }
}

fn powered_rail() -> PowerDomain {
    PowerDomain::seeded(RailId::Sensor, sensor_users::MASK, sensor_users::BACKLIGHT)
}

#[test]
fn als_init_then_ps_cycle_walks_the_table() {
    let rail = powered_rail();
    let mut machine = PsAlsMachine::new();
    let mut sequencer = ScriptedSequencer::default();
    let mut sink = RecordingSink::default();

    // ALS soft init from everything-off powers the sensor block on.
    let transition = machine
        .power_manager(
            SensorUser::Als,
            SensorRequest::Init,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .expect("init should succeed");
    assert_eq!(transition.state, CombinedState::PsOffAlsOn);
    assert_eq!(sequencer.power_ons, 1);

    let transition = machine
        .power_manager(
            SensorUser::Ps,
            SensorRequest::On,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .unwrap();
    assert_eq!(transition.state, CombinedState::PsOnAlsOn);

    let transition = machine
        .power_manager(
            SensorUser::Ps,
            SensorRequest::Off,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .unwrap();
    assert_eq!(
        transition.state,
        CombinedState::PsOffAlsOn,
        "ALS keeps the sensor block alive across the PS teardown"
    );
    assert_eq!(sequencer.power_offs, 0);

    let transition = machine
        .power_manager(
            SensorUser::Als,
            SensorRequest::Off,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .unwrap();
    assert_eq!(transition.state, CombinedState::PowerOff);
    assert_eq!(sequencer.power_offs, 1, "last function off tears the block down");

    assert_eq!(
        sequencer.actions,
        vec![
            SensorAction::CalibrateAls,
            SensorAction::EnablePs,
            SensorAction::DisablePs,
            SensorAction::DisableAls,
        ]
    );
}

#[test]
fn ps_round_trip_restores_the_prior_state() {
    let rail = powered_rail();
    let mut sequencer = ScriptedSequencer::default();
    let mut sink = NoopSnapshotSink;

    for seed in [
        SensorSnapshot::default(),
        SensorSnapshot {
            ps_on: false,
            als_on: true,
        },
    ] {
        let mut machine = PsAlsMachine::from_snapshot(seed);
        let before = machine.status().combined;

        machine
            .power_manager(SensorUser::Ps, SensorRequest::On, &rail, &mut sequencer, &mut sink)
            .unwrap();
        machine
            .power_manager(SensorUser::Ps, SensorRequest::Off, &rail, &mut sequencer, &mut sink)
            .unwrap();

        assert_eq!(
            machine.status().combined,
            before,
            "PS on/off with no ALS request in between must restore the state"
        );
    }
}

#[test]
fn committed_transitions_reach_the_snapshot_sink() {
    let rail = powered_rail();
    let mut machine = PsAlsMachine::new();
    let mut sequencer = ScriptedSequencer::default();
    let mut sink = RecordingSink::default();

    machine
        .als_user_manager(
            als_users::LIGHT_APP,
            SensorRequest::On,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .unwrap();
    machine
        .power_manager(SensorUser::Ps, SensorRequest::On, &rail, &mut sequencer, &mut sink)
        .unwrap();

    assert_eq!(
        sink.snapshots,
        vec![
            SensorSnapshot {
                ps_on: false,
                als_on: true
            },
            SensorSnapshot {
                ps_on: true,
                als_on: true
            },
        ]
    );
}

#[test]
fn no_op_rows_leave_everything_untouched() {
    let rail = powered_rail();
    let mut machine = PsAlsMachine::new();
    let mut sequencer = ScriptedSequencer::default();
    let mut sink = RecordingSink::default();

    // PS off while already off: no table entry, no hardware traffic.
    let transition = machine
        .power_manager(
            SensorUser::Ps,
            SensorRequest::Off,
            &rail,
            &mut sequencer,
            &mut sink,
        )
        .unwrap();
    assert_eq!(transition.state, CombinedState::PowerOff);
    assert!(sequencer.actions.is_empty());
    assert!(sink.snapshots.is_empty(), "no commit, no snapshot");
}
