//! Hardware factor decoding and the top-half → bottom-half FIFO.
//!
//! A "factor" is the hardware-reported bit naming which condition raised the
//! shared interrupt line. The top half latches the factor bits under the
//! sequencer lock and feeds one queue node per set slot into the FIFO; the
//! bottom half drains the FIFO, coalescing bursts of the same factor into a
//! single callback invocation.

use heapless::Deque;

use super::IrqKind;
use crate::error::DriverError;

/// Number of factor slots examined per latch pass.
pub const MAX_FACTOR_SLOTS: usize = 8;

/// Capacity of the queued-factor FIFO.
pub const FACTOR_QUEUE_DEPTH: usize = 16;

/// Factor codes reported in the interrupt latch register.
pub mod factor {
    pub const PS_TRIGGER: u8 = 1 << 0;
    pub const ALS_TRIGGER: u8 = 1 << 1;
    pub const DEVICE_DETECT: u8 = 1 << 2;
    pub const BUS_FAULT: u8 = 1 << 3;
    pub const ALS_REPORT: u8 = 1 << 4;
}

/// Latched factor bits read from the hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct FactorBits(pub u8);

impl FactorBits {
    /// Returns `true` when no factor is pending.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when `code` is among the latched factors.
    pub const fn contains(self, code: u8) -> bool {
        self.0 & code != 0
    }

    /// Iterates the latched factor codes in slot order (LSB first).
    pub fn slots(self) -> impl Iterator<Item = u8> {
        (0..MAX_FACTOR_SLOTS as u32)
            .map(|slot| 1u8 << slot)
            .filter(move |code| self.contains(*code))
    }
}

/// Maps a factor code to the logical interrupt it raises.
///
/// Unknown codes have no subscriber semantics and are dropped by the caller.
pub const fn irq_kind_for(code: u8) -> Option<IrqKind> {
    match code {
        factor::PS_TRIGGER => Some(IrqKind::PsTrigger),
        factor::ALS_TRIGGER => Some(IrqKind::AlsTrigger),
        factor::DEVICE_DETECT => Some(IrqKind::DeviceDetect),
        factor::BUS_FAULT => Some(IrqKind::BusFault),
        factor::ALS_REPORT => Some(IrqKind::AlsReport),
        _ => None,
    }
}

/// FIFO of factor codes between the two deferred stages.
///
/// Nodes are owned by the queue from push until [`pop_coalesced`]
/// (FactorQueue::pop_coalesced) hands them to the bottom half.
pub struct FactorQueue {
    nodes: Deque<u8, FACTOR_QUEUE_DEPTH>,
}

impl FactorQueue {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            nodes: Deque::new(),
        }
    }

    /// Returns `true` when no node is queued.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of queued nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Appends one node; a full queue drops the factor (best effort, the
    /// caller logs it).
    pub fn push(&mut self, code: u8) -> Result<(), DriverError> {
        self.nodes
            .push_back(code)
            .map_err(|_| DriverError::QueueFull)
    }

    /// Pops the head node and discards every other queued node carrying the
    /// same factor code, so a burst of identical events dispatches once.
    pub fn pop_coalesced(&mut self) -> Option<u8> {
        let head = self.nodes.pop_front()?;
        for _ in 0..self.nodes.len() {
            // Rotate the survivors once, dropping duplicates of the head.
            let node = self
                .nodes
                .pop_front()
                .unwrap_or(head);
            if node != head {
                let _ = self.nodes.push_back(node);
            }
        }
        Some(head)
    }
}

impl Default for FactorQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Decisions taken by one top-half latch pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LatchOutcome {
    /// Nodes appended to the FIFO.
    pub queued: usize,
    /// Factors dropped because the FIFO was full.
    pub dropped: usize,
    /// `true` when at least one node was appended and the bottom half must
    /// be scheduled (once per pass).
    pub schedule_bottom_half: bool,
    /// `true` when the shared interrupt line may be re-enabled: neither
    /// device-detect nor bus-fault is pending.
    pub reenable_line: bool,
}

/// Enumerates the latched factors into the FIFO and reports what the top
/// half must do next. Runs under the factor-queue lock.
pub fn latch_pass(bits: FactorBits, queue: &mut FactorQueue) -> LatchOutcome {
    let mut queued = 0;
    let mut dropped = 0;
    for code in bits.slots() {
        match queue.push(code) {
            Ok(()) => queued += 1,
            Err(_) => dropped += 1,
        }
    }
    LatchOutcome {
        queued,
        dropped,
        schedule_bottom_half: queued > 0,
        reenable_line: !bits.contains(factor::DEVICE_DETECT) && !bits.contains(factor::BUS_FAULT),
    }
}
