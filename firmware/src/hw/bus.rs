//! Blocking register access to the BDIC over the sensor bus.
//!
//! The ASIC's real register map is not reproduced here; the driver only
//! needs a handful of opaque control registers to exercise power sequences,
//! the interrupt factor latch, and brightness application. Everything above
//! this module talks to [`RegisterBus`], so host tests can substitute an
//! in-memory bus.

use bdic_core::irq::factors::FactorBits;
use bdic_core::power::{RailId, RailSequencer};
use bdic_core::sensor::{SensorAction, SensorSequencer};

/// Failure of one bus transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusError {
    /// The transfer did not complete in time.
    Timeout,
    /// The transfer completed but the device signaled a fault.
    Fault,
}

impl BusError {
    /// Short label for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            BusError::Timeout => "timeout",
            BusError::Fault => "fault",
        }
    }
}

/// Opaque BDIC control registers.
pub mod regs {
    /// Rail enable bits (sensor/display and LED).
    pub const POWER_CTL: u8 = 0x02;
    /// Sensor block power.
    pub const SENSOR_POWER: u8 = 0x10;
    /// PS/ALS measurement control.
    pub const SENSOR_CTL: u8 = 0x11;
    /// One-shot ALS calibration trigger.
    pub const ALS_CAL: u8 = 0x12;
    /// Latched interrupt factor bits.
    pub const INT_FACTOR: u8 = 0x20;
    /// Write-one-to-clear factor latch.
    pub const INT_CLEAR: u8 = 0x21;
    /// Bus-fault status/clear.
    pub const FAULT_CLEAR: u8 = 0x22;
    /// Backlight brightness level.
    pub const BKL_LEVEL: u8 = 0x30;
}

/// Rail enable bits within [`regs::POWER_CTL`].
mod power_bits {
    pub const SENSOR_RAIL: u8 = 1 << 0;
    pub const LED_RAIL: u8 = 1 << 1;
}

/// Measurement enable bits within [`regs::SENSOR_CTL`].
mod sensor_bits {
    pub const PS: u8 = 1 << 0;
    pub const ALS: u8 = 1 << 1;
}

/// Blocking register read/write primitives.
pub trait RegisterBus {
    fn read(&mut self, reg: u8) -> Result<u8, BusError>;

    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError>;

    /// Read-modify-write helper for set/clear of register bits.
    fn update(&mut self, reg: u8, mask: u8, on: bool) -> Result<(), BusError> {
        let current = self.read(reg)?;
        let next = if on { current | mask } else { current & !mask };
        self.write(reg, next)
    }
}

/// I2C transport for the BDIC.
#[cfg(target_os = "none")]
pub struct BdicI2cBus<'d> {
    i2c: embassy_stm32::i2c::I2c<'d, embassy_stm32::mode::Blocking>,
    address: u8,
}

#[cfg(target_os = "none")]
impl<'d> BdicI2cBus<'d> {
    pub fn new(i2c: embassy_stm32::i2c::I2c<'d, embassy_stm32::mode::Blocking>, address: u8) -> Self {
        Self { i2c, address }
    }

    fn map_error(error: embassy_stm32::i2c::Error) -> BusError {
        match error {
            embassy_stm32::i2c::Error::Timeout => BusError::Timeout,
            _ => BusError::Fault,
        }
    }
}

#[cfg(target_os = "none")]
impl RegisterBus for BdicI2cBus<'_> {
    fn read(&mut self, reg: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.i2c
            .blocking_write_read(self.address, &[reg], &mut value)
            .map_err(Self::map_error)?;
        Ok(value[0])
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .blocking_write(self.address, &[reg, value])
            .map_err(Self::map_error)
    }
}

/// Fixed settle delay after the sensor block powers on, in milliseconds.
pub const SENSOR_SETTLE_MS: u64 = 10;

/// Fixed settle delay inside a bus-fault recovery pass, in milliseconds.
pub const RECOVERY_SETTLE_MS: u64 = 20;

#[cfg(target_os = "none")]
fn delay_ms(ms: u64) {
    embassy_time::block_for(embassy_time::Duration::from_millis(ms));
}

#[cfg(not(target_os = "none"))]
fn delay_ms(_: u64) {}

/// Hardware sequencer driving every BDIC power and sensor sequence over a
/// [`RegisterBus`]. Callers serialize access through the sequencer lock.
pub struct BdicSequencer<B> {
    bus: B,
}

impl<B: RegisterBus> BdicSequencer<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    /// Reads the latched interrupt factor bits.
    pub fn read_factors(&mut self) -> Result<FactorBits, BusError> {
        self.bus.read(regs::INT_FACTOR).map(FactorBits)
    }

    /// Clears the given bits from the factor latch.
    pub fn clear_factors(&mut self, bits: FactorBits) -> Result<(), BusError> {
        self.bus.write(regs::INT_CLEAR, bits.0)
    }

    /// Clears the bus-fault condition at the device.
    pub fn clear_bus_fault(&mut self) -> Result<(), BusError> {
        self.bus.write(regs::FAULT_CLEAR, 0x01)
    }

    /// Applies a backlight brightness level.
    pub fn set_brightness(&mut self, level: u8) -> Result<(), BusError> {
        self.bus.write(regs::BKL_LEVEL, level)
    }

    /// Waits out the recovery settle interval.
    pub fn recovery_settle(&mut self) {
        delay_ms(RECOVERY_SETTLE_MS);
    }
}

impl<B: RegisterBus> RailSequencer for BdicSequencer<B> {
    type Error = BusError;

    fn rail_on(&mut self, rail: RailId) -> Result<(), Self::Error> {
        let mask = match rail {
            RailId::Sensor => power_bits::SENSOR_RAIL,
            RailId::Led => power_bits::LED_RAIL,
        };
        self.bus.update(regs::POWER_CTL, mask, true)
    }

    fn rail_off(&mut self, rail: RailId) -> Result<(), Self::Error> {
        let mask = match rail {
            RailId::Sensor => power_bits::SENSOR_RAIL,
            RailId::Led => power_bits::LED_RAIL,
        };
        self.bus.update(regs::POWER_CTL, mask, false)
    }
}

impl<B: RegisterBus> SensorSequencer for BdicSequencer<B> {
    type Error = BusError;

    fn sensor_power_on(&mut self) -> Result<(), Self::Error> {
        self.bus.write(regs::SENSOR_POWER, 0x01)
    }

    fn sensor_power_off(&mut self) -> Result<(), Self::Error> {
        self.bus.write(regs::SENSOR_POWER, 0x00)
    }

    fn settle(&mut self) {
        delay_ms(SENSOR_SETTLE_MS);
    }

    fn apply(&mut self, action: SensorAction) -> Result<(), Self::Error> {
        match action {
            SensorAction::EnablePs => self.bus.update(regs::SENSOR_CTL, sensor_bits::PS, true),
            SensorAction::DisablePs => self.bus.update(regs::SENSOR_CTL, sensor_bits::PS, false),
            SensorAction::EnableAls => self.bus.update(regs::SENSOR_CTL, sensor_bits::ALS, true),
            SensorAction::DisableAls => self.bus.update(regs::SENSOR_CTL, sensor_bits::ALS, false),
            SensorAction::CalibrateAls => {
                self.bus.write(regs::ALS_CAL, 0x01)?;
                self.bus.update(regs::SENSOR_CTL, sensor_bits::ALS, true)
            }
        }
    }
}
