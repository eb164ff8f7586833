use core::cell::RefCell;

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Pull;
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use static_cell::StaticCell;

use bdic_core::irq::factors::FactorQueue;
use bdic_core::irq::{IrqKind, SubscriptionRegistry};
use bdic_core::power::{PowerDomain, RailId, led_users, sensor_users};
use bdic_core::recovery::RecoveryState;
use bdic_core::wake::WakeCounter;

use crate::bdic::{
    self, BacklightChannel, BottomHalfChannel, CoreLock, FactorLock, LineGates, RecoveryChannel,
    RecoveryLock, RegistryLock, SensorCore, StatusMirror, TopHalfChannel,
};
use crate::hw::bus::{BdicI2cBus, BdicSequencer};

mod als_poll_task;
mod backlight_task;
mod bottom_half_task;
mod irq_task;
mod recovery_task;
mod top_half_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// I2C target address of the BDIC.
const BDIC_ADDRESS: u8 = 0x39;

pub(super) static WAKE: WakeCounter = WakeCounter::new();
pub(super) static TOP_HALF: TopHalfChannel = Channel::new();
pub(super) static BOTTOM_HALF: BottomHalfChannel = Channel::new();
pub(super) static RECOVERY: RecoveryChannel = Channel::new();
pub(super) static BACKLIGHT: BacklightChannel = Channel::new();
pub(super) static REGISTRY: RegistryLock =
    BlockingMutex::new(RefCell::new(SubscriptionRegistry::new()));
pub(super) static FACTORS: FactorLock = BlockingMutex::new(RefCell::new(FactorQueue::new()));
pub(super) static RECOVERY_STATE: RecoveryLock =
    BlockingMutex::new(RefCell::new(RecoveryState::new()));
pub(super) static GATES: LineGates = LineGates::new();
pub(super) static STATUS: StatusMirror = StatusMirror::new();

/// Pulsed whenever the shared interrupt line may re-arm: after a clean
/// top-half pass, after a bottom-half drain with no recovery pending, and
/// after a recovery pass.
pub(super) static LINE_REENABLE: Signal<ThreadModeRawMutex, ()> = Signal::new();

static CORE: StaticCell<CoreLock<BdicI2cBus<'static>>> = StaticCell::new();

fn on_bus_fault(_: IrqKind) {
    let _ = bdic::recovery::request_recovery(&RECOVERY_STATE, STATUS.load(), &WAKE, &RECOVERY);
}

fn on_ps_trigger(_: IrqKind) {
    defmt::info!("sensor: proximity threshold crossed");
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        I2C1,
        PB6,
        PB7,
        PA0,
        PA1,
        EXTI0,
        EXTI1,
        ..
    } = hal::init(config);

    let i2c = I2c::new_blocking(I2C1, PB6, PB7, Hertz(100_000), Default::default());
    let sequencer = BdicSequencer::new(BdicI2cBus::new(i2c, BDIC_ADDRESS));

    let core = CORE.init(Mutex::new(SensorCore::new(
        sequencer,
        PowerDomain::new(RailId::Sensor, sensor_users::MASK),
        PowerDomain::new(RailId::Led, led_users::MASK),
        None,
    )));

    // Standing subscriptions, installed before any task can raise an event.
    if bdic::dispatch::subscribe(&REGISTRY, &GATES, IrqKind::BusFault, on_bus_fault).is_err() {
        defmt::error!("irq: bus-fault subscription failed");
    }
    if bdic::dispatch::subscribe(&REGISTRY, &GATES, IrqKind::PsTrigger, on_ps_trigger).is_err() {
        defmt::error!("irq: proximity subscription failed");
    }

    let irq_line = ExtiInput::new(PA0, EXTI0, Pull::Up);
    let detect_line = ExtiInput::new(PA1, EXTI1, Pull::Up);

    spawner
        .spawn(irq_task::run(irq_line))
        .expect("failed to spawn interrupt line task");
    spawner
        .spawn(irq_task::run_detect(detect_line))
        .expect("failed to spawn detect line task");
    spawner
        .spawn(top_half_task::run(core))
        .expect("failed to spawn top-half task");
    spawner
        .spawn(bottom_half_task::run())
        .expect("failed to spawn bottom-half task");
    spawner
        .spawn(recovery_task::run(core))
        .expect("failed to spawn recovery task");
    spawner
        .spawn(backlight_task::run(core))
        .expect("failed to spawn backlight task");
    spawner
        .spawn(als_poll_task::run())
        .expect("failed to spawn ambient-light poll task");

    core::future::pending::<()>().await;
}
