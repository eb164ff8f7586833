//! BDIC driver surface bridging firmware tasks with `bdic-core`.
//!
//! One bounded channel per deferred stage, one async mutex serializing
//! every bus transaction, and blocking mutexes for the pure-bookkeeping
//! state the dispatcher touches from multiple tasks.

pub mod backlight;
pub mod dispatch;
pub mod recovery;

use core::cell::RefCell;

use bdic_core::irq::factors::FactorQueue;
use bdic_core::irq::{IrqKind, LineUpdate, SubscriptionRegistry};
use bdic_core::power::PowerDomain;
use bdic_core::recovery::RecoveryState;
use bdic_core::sensor::{PsAlsMachine, SensorSnapshot, SnapshotSink};
use bdic_core::wake::WakeLease;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::hw::bus::{BdicSequencer, RegisterBus};

/// Raw mutex backing every lock and channel in the driver: thread-mode on
/// the target, no-op in host tests.
#[cfg(target_os = "none")]
pub type BdicRawMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub type BdicRawMutex = NoopRawMutex;

/// Depth of the ISR → top-half channel.
pub const TOP_HALF_QUEUE_DEPTH: usize = 2;

/// Depth of the backlight request channel.
pub const BACKLIGHT_QUEUE_DEPTH: usize = 4;

/// Poll cadence for interrupt types without a hardware edge, in
/// milliseconds.
pub const ALS_POLL_INTERVAL_MS: u64 = 100;

/// Delay between the end of a recovery pass and the resume notification to
/// the proximity consumer, in milliseconds.
pub const RECOVERY_NOTIFY_DELAY_MS: u64 = 10;

/// Callback invoked by the bottom half for a dispatched interrupt.
pub type IrqCallback = fn(IrqKind);

/// Wake lease handed from one pipeline stage to the next.
pub type StageLease = WakeLease<'static>;

/// ISR → top-half channel; each message is the ISR's wake hold.
pub type TopHalfChannel = Channel<BdicRawMutex, StageLease, TOP_HALF_QUEUE_DEPTH>;

/// Top-half → bottom-half channel; each message is the batch wake hold.
pub type BottomHalfChannel = Channel<BdicRawMutex, StageLease, 1>;

/// Recovery scheduling channel; at most one pass outstanding.
pub type RecoveryChannel = Channel<BdicRawMutex, StageLease, 1>;

/// Backlight brightness requests from the host boundary.
pub type BacklightChannel = Channel<BdicRawMutex, u8, BACKLIGHT_QUEUE_DEPTH>;

/// State serialized by the hardware-sequencer lock. Every bus transaction
/// in the driver goes through this bundle while the async mutex is held.
pub struct SensorCore<B> {
    pub sequencer: BdicSequencer<B>,
    pub sensor_rail: PowerDomain,
    pub led_rail: PowerDomain,
    pub machine: PsAlsMachine,
}

/// The hardware-sequencer lock.
pub type CoreLock<B> = Mutex<BdicRawMutex, SensorCore<B>>;

/// Subscription table behind its own bookkeeping lock.
pub type RegistryLock = BlockingMutex<BdicRawMutex, RefCell<SubscriptionRegistry<IrqCallback>>>;

/// Factor FIFO behind its own bookkeeping lock.
pub type FactorLock = BlockingMutex<BdicRawMutex, RefCell<FactorQueue>>;

/// Recovery flag/snapshot behind its own bookkeeping lock.
pub type RecoveryLock = BlockingMutex<BdicRawMutex, RefCell<RecoveryState>>;

/// Mirror bits of the last committed PS/ALS snapshot.
mod snapshot_bits {
    pub const PS: u8 = 1 << 0;
    pub const ALS: u8 = 1 << 1;
}

/// Last committed PS/ALS snapshot, readable without the sequencer lock.
///
/// `request_recovery` runs in bottom-half context and must capture the
/// status at fault time without waiting behind a bus transaction, so every
/// committed transition mirrors its snapshot here.
#[derive(Debug, Default)]
pub struct StatusMirror {
    bits: AtomicU8,
}

impl StatusMirror {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    pub fn store(&self, snapshot: SensorSnapshot) {
        let mut bits = 0;
        if snapshot.ps_on {
            bits |= snapshot_bits::PS;
        }
        if snapshot.als_on {
            bits |= snapshot_bits::ALS;
        }
        self.bits.store(bits, Ordering::Release);
    }

    pub fn load(&self) -> SensorSnapshot {
        let bits = self.bits.load(Ordering::Acquire);
        SensorSnapshot {
            ps_on: bits & snapshot_bits::PS != 0,
            als_on: bits & snapshot_bits::ALS != 0,
        }
    }
}

/// Snapshot sink that mirrors commits into a [`StatusMirror`].
///
/// The persisted boot-context store sits behind the host boundary; the
/// mirror is what this driver keeps for fault-time capture.
pub struct MirrorSink<'a> {
    mirror: &'a StatusMirror,
}

impl<'a> MirrorSink<'a> {
    pub const fn new(mirror: &'a StatusMirror) -> Self {
        Self { mirror }
    }
}

impl SnapshotSink for MirrorSink<'_> {
    fn store(&mut self, snapshot: SensorSnapshot) {
        self.mirror.store(snapshot);
    }
}

/// Shared gates for the physical interrupt line, the companion detect line,
/// and the poll timer.
///
/// Writers serialize through the registry lock (subscription changes) or
/// the pipeline tasks (mask/unmask), so a gate flip is never lost between a
/// count check and the write.
#[derive(Debug, Default)]
pub struct LineGates {
    irq_line: AtomicBool,
    detect_line: AtomicBool,
    poll_timer: AtomicBool,
}

impl LineGates {
    pub const fn new() -> Self {
        Self {
            irq_line: AtomicBool::new(false),
            detect_line: AtomicBool::new(false),
            poll_timer: AtomicBool::new(false),
        }
    }

    pub fn irq_line_enabled(&self) -> bool {
        self.irq_line.load(Ordering::Acquire)
    }

    pub fn set_irq_line(&self, enabled: bool) {
        self.irq_line.store(enabled, Ordering::Release);
    }

    pub fn detect_line_enabled(&self) -> bool {
        self.detect_line.load(Ordering::Acquire)
    }

    pub fn poll_timer_enabled(&self) -> bool {
        self.poll_timer.load(Ordering::Acquire)
    }

    /// Applies a registry gating decision. Called after the registry lock
    /// is released.
    pub fn apply(&self, update: LineUpdate) {
        if let Some(enabled) = update.irq_line {
            self.irq_line.store(enabled, Ordering::Release);
        }
        if let Some(enabled) = update.detect_line {
            self.detect_line.store(enabled, Ordering::Release);
        }
        if let Some(enabled) = update.poll_timer {
            self.poll_timer.store(enabled, Ordering::Release);
        }
    }
}

impl<B: RegisterBus> SensorCore<B> {
    /// Builds the serialized state bundle, optionally seeded from a
    /// persisted snapshot.
    pub fn new(
        sequencer: BdicSequencer<B>,
        sensor_rail: PowerDomain,
        led_rail: PowerDomain,
        seed: Option<SensorSnapshot>,
    ) -> Self {
        let machine = match seed {
            Some(snapshot) => PsAlsMachine::from_snapshot(snapshot),
            None => PsAlsMachine::new(),
        };
        Self {
            sequencer,
            sensor_rail,
            led_rail,
            machine,
        }
    }
}
