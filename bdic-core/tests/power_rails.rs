use bdic_core::error::DriverError;
use bdic_core::power::{PowerDomain, RailId, RailSequencer, led_users, sensor_users};

#[derive(Default)]
struct MockRail {
    on_calls: usize,
    off_calls: usize,
}

impl RailSequencer for MockRail {
    type Error = ();

    fn rail_on(&mut self, _: RailId) -> Result<(), Self::Error> {
        self.on_calls += 1;
        Ok(())
    }

    fn rail_off(&mut self, _: RailId) -> Result<(), Self::Error> {
        self.off_calls += 1;
        Ok(())
    }
}

const USER_BITS: [u8; 3] = [
    sensor_users::BACKLIGHT,
    sensor_users::PS,
    sensor_users::ALS,
];

/// Replays a call sequence and checks the rail invariant after every step:
/// `users` equals the OR of currently-on requesters and the rail is powered
/// exactly when `users != 0`.
fn replay(calls: &[(u8, bool)]) {
    let mut domain = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
    let mut rail = MockRail::default();
    let mut expected: u8 = 0;

    for &(bit, on) in calls {
        domain
            .set(bit, on, &mut rail)
            .expect("every set call in the schedule is valid");
        if on {
            expected |= bit;
        } else {
            expected &= !bit;
        }

        assert_eq!(domain.users(), expected, "users must equal the OR of on requesters");
        assert_eq!(
            domain.is_on(),
            expected != 0,
            "rail power must track the user set"
        );
    }
}

#[test]
fn invariant_holds_across_interleaved_orders() {
    // Every serialized interleaving of three users toggling on then off.
    // The sequencer lock serializes concurrent callers, so call-order
    // permutations cover the observable interleavings.
    let mut schedule = Vec::new();
    for a in 0..3 {
        for b in 0..3 {
            for c in 0..3 {
                if a == b || b == c || a == c {
                    continue;
                }
                schedule.clear();
                schedule.push((USER_BITS[a], true));
                schedule.push((USER_BITS[b], true));
                schedule.push((USER_BITS[a], false));
                schedule.push((USER_BITS[c], true));
                schedule.push((USER_BITS[b], false));
                schedule.push((USER_BITS[c], false));
                replay(&schedule);
            }
        }
    }
}

#[test]
fn redundant_requests_do_not_skew_the_count() {
    replay(&[
        (sensor_users::PS, true),
        (sensor_users::PS, true),
        (sensor_users::ALS, false),
        (sensor_users::PS, false),
        (sensor_users::PS, false),
    ]);
}

#[test]
fn rails_are_independent_instances() {
    let mut sensor = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
    let mut led = PowerDomain::new(RailId::Led, led_users::MASK);
    let mut rail = MockRail::default();

    sensor.set(sensor_users::PS, true, &mut rail).unwrap();
    led.set(led_users::RED, true, &mut rail).unwrap();
    assert_eq!(rail.on_calls, 2, "each rail runs its own power-on sequence");

    sensor.set(sensor_users::PS, false, &mut rail).unwrap();
    assert!(led.is_on(), "tearing down one rail must not affect the other");

    // Bits outside the domain mask are rejected.
    assert_eq!(
        sensor.set(1 << 5, true, &mut rail),
        Err(DriverError::Invalid)
    );
}
