//! Reference-counted control of the shared hardware power rails.
//!
//! The BDIC exposes two physically distinct rails: the sensor/display rail
//! shared by backlight, proximity and ambient-light functions, and the LED
//! rail shared by the tri-color channels. Both are managed by the same
//! [`PowerDomain`] bookkeeping; only the user-bit masks differ. Hardware
//! on/off sequences enter through [`RailSequencer`] so the accounting can be
//! tested without a bus.

use crate::error::DriverError;

/// Identifier for the rails the driver manages.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RailId {
    /// Sensor/display rail feeding backlight, PS and ALS.
    Sensor,
    /// Tri-color LED rail.
    Led,
}

/// Power state of one rail.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RailState {
    #[default]
    Off,
    On,
}

/// User bits accepted by the sensor/display rail.
pub mod sensor_users {
    pub const BACKLIGHT: u8 = 1 << 0;
    pub const PS: u8 = 1 << 1;
    pub const ALS: u8 = 1 << 2;

    pub const MASK: u8 = BACKLIGHT | PS | ALS;
}

/// User bits accepted by the LED rail.
pub mod led_users {
    pub const RED: u8 = 1 << 0;
    pub const GREEN: u8 = 1 << 1;
    pub const BLUE: u8 = 1 << 2;

    pub const MASK: u8 = RED | GREEN | BLUE;
}

/// Hardware power on/off sequences for a rail.
pub trait RailSequencer {
    /// Bus transaction error type.
    type Error;

    /// Runs the rail's power-on sequence.
    fn rail_on(&mut self, rail: RailId) -> Result<(), Self::Error>;

    /// Runs the rail's power-off sequence.
    fn rail_off(&mut self, rail: RailId) -> Result<(), Self::Error>;
}

/// Reference-counted bookkeeping for one shared rail.
///
/// Invariant: `state == On ⟺ users != 0`, except immediately after a failed
/// power-off sequence, where `users` still commits to zero and the caller
/// logs the stuck rail.
#[derive(Clone, Debug)]
pub struct PowerDomain {
    rail: RailId,
    mask: u8,
    present: bool,
    state: RailState,
    users: u8,
}

impl PowerDomain {
    /// Creates bookkeeping for a physically present rail.
    pub const fn new(rail: RailId, mask: u8) -> Self {
        Self {
            rail,
            mask,
            present: true,
            state: RailState::Off,
            users: 0,
        }
    }

    /// Creates bookkeeping for a rail this board does not populate.
    ///
    /// Every [`set`](Self::set) call on an absent rail is benign success.
    pub const fn absent(rail: RailId, mask: u8) -> Self {
        Self {
            rail,
            mask,
            present: false,
            state: RailState::Off,
            users: 0,
        }
    }

    /// Seeds bookkeeping from a persisted boot-context snapshot.
    pub const fn seeded(rail: RailId, mask: u8, users: u8) -> Self {
        let users = users & mask;
        Self {
            rail,
            mask,
            present: true,
            state: if users != 0 {
                RailState::On
            } else {
                RailState::Off
            },
            users,
        }
    }

    /// Returns the rail this domain manages.
    pub const fn rail(&self) -> RailId {
        self.rail
    }

    /// Returns `true` when the rail is physically populated.
    pub const fn is_present(&self) -> bool {
        self.present
    }

    /// Returns `true` when the rail is powered.
    pub const fn is_on(&self) -> bool {
        matches!(self.state, RailState::On)
    }

    /// Returns the bitmask of users currently holding the rail on.
    pub const fn users(&self) -> u8 {
        self.users
    }

    /// Adds or removes one user's hold on the rail.
    ///
    /// Turning on runs the power-on sequence before the bit is added, so a
    /// failed sequence leaves the bookkeeping untouched. Turning off always
    /// commits the updated user set; when the last bit drops and the
    /// power-off sequence fails, the error is surfaced but `users` is zero
    /// regardless.
    pub fn set<S: RailSequencer>(
        &mut self,
        user_bit: u8,
        on: bool,
        sequencer: &mut S,
    ) -> Result<(), DriverError<S::Error>> {
        if user_bit == 0 || user_bit & !self.mask != 0 {
            return Err(DriverError::Invalid);
        }
        if !self.present {
            return Ok(());
        }

        if on {
            if matches!(self.state, RailState::Off) {
                sequencer.rail_on(self.rail)?;
                self.state = RailState::On;
            }
            self.users |= user_bit;
            return Ok(());
        }

        let remaining = self.users & !user_bit;
        let result = if remaining == 0 && matches!(self.state, RailState::On) {
            match sequencer.rail_off(self.rail) {
                Ok(()) => {
                    self.state = RailState::Off;
                    Ok(())
                }
                Err(err) => Err(DriverError::Bus(err)),
            }
        } else {
            Ok(())
        };

        self.users = remaining;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingRail {
        on_calls: usize,
        off_calls: usize,
        fail_on: bool,
        fail_off: bool,
    }

    impl RailSequencer for CountingRail {
        type Error = &'static str;

        fn rail_on(&mut self, _: RailId) -> Result<(), Self::Error> {
            self.on_calls += 1;
            if self.fail_on { Err("on failed") } else { Ok(()) }
        }

        fn rail_off(&mut self, _: RailId) -> Result<(), Self::Error> {
            self.off_calls += 1;
            if self.fail_off { Err("off failed") } else { Ok(()) }
        }
    }

    #[test]
    fn first_user_powers_rail_once() {
        let mut domain = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
        let mut rail = CountingRail::default();

        domain
            .set(sensor_users::PS, true, &mut rail)
            .expect("first user should power the rail");
        domain
            .set(sensor_users::ALS, true, &mut rail)
            .expect("second user should reuse the powered rail");

        assert!(domain.is_on());
        assert_eq!(domain.users(), sensor_users::PS | sensor_users::ALS);
        assert_eq!(rail.on_calls, 1, "power-on sequence must run exactly once");
    }

    #[test]
    fn last_user_tears_rail_down() {
        let mut domain = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
        let mut rail = CountingRail::default();

        domain.set(sensor_users::PS, true, &mut rail).unwrap();
        domain.set(sensor_users::ALS, true, &mut rail).unwrap();

        domain.set(sensor_users::PS, false, &mut rail).unwrap();
        assert!(domain.is_on(), "rail must stay up while a user remains");
        assert_eq!(rail.off_calls, 0);

        domain.set(sensor_users::ALS, false, &mut rail).unwrap();
        assert!(!domain.is_on());
        assert_eq!(domain.users(), 0);
        assert_eq!(rail.off_calls, 1);
    }

    #[test]
    fn rejects_bits_outside_the_mask() {
        let mut domain = PowerDomain::new(RailId::Led, led_users::MASK);
        let mut rail = CountingRail::default();

        assert_eq!(
            domain.set(0, true, &mut rail),
            Err(DriverError::Invalid),
            "zero bit is not a domain member"
        );
        assert_eq!(
            domain.set(0x80, true, &mut rail),
            Err(DriverError::Invalid),
        );
        assert_eq!(rail.on_calls, 0);
    }

    #[test]
    fn absent_rail_reports_benign_success() {
        let mut domain = PowerDomain::absent(RailId::Sensor, sensor_users::MASK);
        let mut rail = CountingRail::default();

        domain.set(sensor_users::BACKLIGHT, true, &mut rail).unwrap();
        assert!(!domain.is_on());
        assert_eq!(domain.users(), 0);
        assert_eq!(rail.on_calls, 0);
    }

    #[test]
    fn failed_power_on_leaves_state_untouched() {
        let mut domain = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
        let mut rail = CountingRail {
            fail_on: true,
            ..CountingRail::default()
        };

        let result = domain.set(sensor_users::PS, true, &mut rail);
        assert_eq!(result, Err(DriverError::Bus("on failed")));
        assert!(!domain.is_on());
        assert_eq!(domain.users(), 0, "bit must not be added after a failed sequence");
    }

    #[test]
    fn failed_power_off_still_commits_bookkeeping() {
        let mut domain = PowerDomain::new(RailId::Sensor, sensor_users::MASK);
        let mut rail = CountingRail::default();
        domain.set(sensor_users::PS, true, &mut rail).unwrap();

        rail.fail_off = true;
        let result = domain.set(sensor_users::PS, false, &mut rail);
        assert_eq!(result, Err(DriverError::Bus("off failed")));
        assert_eq!(domain.users(), 0, "user bookkeeping commits even when the sequence fails");
        assert!(domain.is_on(), "rail state reflects the sequence that never completed");
    }

    #[test]
    fn seeded_domain_restores_users_and_state() {
        let domain = PowerDomain::seeded(RailId::Sensor, sensor_users::MASK, sensor_users::ALS);
        assert!(domain.is_on());
        assert_eq!(domain.users(), sensor_users::ALS);

        let empty = PowerDomain::seeded(RailId::Sensor, sensor_users::MASK, 0);
        assert!(!empty.is_on());
    }
}
