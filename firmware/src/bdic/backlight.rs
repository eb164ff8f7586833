//! Backlight brightness requests and their hold on the sensor/display rail.
//!
//! The backlight is one more user bit on the shared rail: a non-zero level
//! takes the hold before programming brightness, and level zero programs
//! zero before releasing it, so the rail never drops under a lit panel.

use bdic_core::error::DriverError;
use bdic_core::power::sensor_users;

use super::SensorCore;
use crate::hw::bus::{BusError, RegisterBus};

#[cfg(target_os = "none")]
fn log_apply_failed(level: u8) {
    defmt::warn!("backlight: level {} not applied", level);
}

#[cfg(not(target_os = "none"))]
fn log_apply_failed(level: u8) {
    println!("backlight: level {level} not applied");
}

/// Applies one brightness request under the sequencer lock.
pub fn apply_backlight<B: RegisterBus>(
    core: &mut SensorCore<B>,
    level: u8,
) -> Result<(), DriverError<BusError>> {
    let result = apply_level(core, level);
    if result.is_err() {
        log_apply_failed(level);
    }
    result
}

fn apply_level<B: RegisterBus>(
    core: &mut SensorCore<B>,
    level: u8,
) -> Result<(), DriverError<BusError>> {
    if level > 0 {
        core.sensor_rail
            .set(sensor_users::BACKLIGHT, true, &mut core.sequencer)?;
        core.sequencer.set_brightness(level)?;
    } else {
        core.sequencer.set_brightness(0)?;
        core.sensor_rail
            .set(sensor_users::BACKLIGHT, false, &mut core.sequencer)?;
    }
    Ok(())
}
