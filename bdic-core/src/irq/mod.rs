//! Logical interrupt types, the subscription table, and line gating.
//!
//! The registry decides which hardware gates (shared interrupt line,
//! companion detect line, poll timer) must change as subscribers come and
//! go, but never touches them itself: it returns a [`LineUpdate`] the caller
//! applies after releasing the registry lock, so gate writes never happen
//! under bookkeeping locks.

pub mod factors;

use crate::error::DriverError;

/// Logical interrupt types delivered to subscribers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqKind {
    /// Proximity detection threshold crossed.
    PsTrigger,
    /// Ambient-light threshold crossed.
    AlsTrigger,
    /// Panel/device detect companion line.
    DeviceDetect,
    /// Sensor-bus transaction fault.
    BusFault,
    /// Periodic ambient-light report; no hardware edge exists for it.
    AlsReport,
}

/// Total number of [`IrqKind`] variants.
pub const IRQ_KIND_COUNT: usize = 5;

/// How an interrupt type reaches the driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqTrigger {
    /// Latched through the shared physical interrupt line.
    Edge,
    /// Sampled by a periodic timer.
    Polled,
}

impl IrqKind {
    /// Deterministic index for subscription-table lookups.
    pub const fn as_index(self) -> usize {
        match self {
            IrqKind::PsTrigger => 0,
            IrqKind::AlsTrigger => 1,
            IrqKind::DeviceDetect => 2,
            IrqKind::BusFault => 3,
            IrqKind::AlsReport => 4,
        }
    }

    /// Attempts to construct an [`IrqKind`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(IrqKind::PsTrigger),
            1 => Some(IrqKind::AlsTrigger),
            2 => Some(IrqKind::DeviceDetect),
            3 => Some(IrqKind::BusFault),
            4 => Some(IrqKind::AlsReport),
            _ => None,
        }
    }

    /// Reports how the interrupt type is delivered.
    pub const fn trigger(self) -> IrqTrigger {
        match self {
            IrqKind::AlsReport => IrqTrigger::Polled,
            _ => IrqTrigger::Edge,
        }
    }
}

/// Gate changes to apply after the registry lock is released.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct LineUpdate {
    /// Enable/disable the shared physical interrupt line.
    pub irq_line: Option<bool>,
    /// Enable/disable the companion detect line.
    pub detect_line: Option<bool>,
    /// Start/stop the periodic poll timer.
    pub poll_timer: Option<bool>,
}

impl LineUpdate {
    /// An update that changes nothing.
    pub const fn none() -> Self {
        Self {
            irq_line: None,
            detect_line: None,
            poll_timer: None,
        }
    }

    /// Returns `true` when no gate changes.
    pub const fn is_empty(&self) -> bool {
        self.irq_line.is_none() && self.detect_line.is_none() && self.poll_timer.is_none()
    }
}

/// Callback table mapping interrupt types to subscribers.
///
/// Mutated under its own lock, distinct from the hardware-sequencer lock, so
/// the dispatcher can look up a callback without waiting behind a slow bus
/// transaction.
pub struct SubscriptionRegistry<C> {
    slots: [Option<C>; IRQ_KIND_COUNT],
    present: bool,
}

impl<C> SubscriptionRegistry<C> {
    /// Creates an empty registry for a present sensor rail.
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; IRQ_KIND_COUNT],
            present: true,
        }
    }

    /// Creates a registry for a board without the sensor rail; every
    /// subscribe/unsubscribe fails with `NotReady`.
    pub const fn unavailable() -> Self {
        Self {
            slots: [const { None }; IRQ_KIND_COUNT],
            present: false,
        }
    }

    fn edge_subscriber_count(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| {
                slot.is_some()
                    && IrqKind::from_index(*index)
                        .is_some_and(|kind| matches!(kind.trigger(), IrqTrigger::Edge))
            })
            .count()
    }

    /// Installs (or replaces) the callback for `kind`.
    ///
    /// Replacing an existing entry is the documented "change" case and
    /// causes no gate updates.
    pub fn subscribe(&mut self, kind: IrqKind, callback: C) -> Result<LineUpdate, DriverError> {
        if !self.present {
            return Err(DriverError::NotReady);
        }

        let was_empty = self.slots[kind.as_index()].is_none();
        self.slots[kind.as_index()] = Some(callback);

        let mut update = LineUpdate::none();
        if was_empty {
            match kind.trigger() {
                IrqTrigger::Edge => {
                    if self.edge_subscriber_count() == 1 {
                        update.irq_line = Some(true);
                    }
                    if matches!(kind, IrqKind::DeviceDetect) {
                        update.detect_line = Some(true);
                    }
                }
                IrqTrigger::Polled => update.poll_timer = Some(true),
            }
        }
        Ok(update)
    }

    /// Removes the callback for `kind`; a missing subscriber is a no-op.
    pub fn unsubscribe(&mut self, kind: IrqKind) -> Result<LineUpdate, DriverError> {
        if !self.present {
            return Err(DriverError::NotReady);
        }

        if self.slots[kind.as_index()].take().is_none() {
            return Ok(LineUpdate::none());
        }

        let mut update = LineUpdate::none();
        match kind.trigger() {
            IrqTrigger::Edge => {
                if self.edge_subscriber_count() == 0 {
                    update.irq_line = Some(false);
                }
                if matches!(kind, IrqKind::DeviceDetect) {
                    update.detect_line = Some(false);
                }
            }
            IrqTrigger::Polled => update.poll_timer = Some(false),
        }
        Ok(update)
    }

    /// Copies out the callback for `kind`, if any.
    pub fn lookup(&self, kind: IrqKind) -> Option<C>
    where
        C: Clone,
    {
        self.slots[kind.as_index()].clone()
    }
}

impl<C> Default for SubscriptionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Callback = fn(IrqKind);

    fn noop(_: IrqKind) {}

    #[test]
    fn first_edge_subscriber_enables_the_line() {
        let mut registry = SubscriptionRegistry::<Callback>::new();

        let update = registry.subscribe(IrqKind::PsTrigger, noop).unwrap();
        assert_eq!(update.irq_line, Some(true));

        let update = registry.subscribe(IrqKind::BusFault, noop).unwrap();
        assert_eq!(update.irq_line, None, "line already enabled by the first subscriber");
    }

    #[test]
    fn last_edge_unsubscribe_disables_the_line() {
        let mut registry = SubscriptionRegistry::<Callback>::new();
        registry.subscribe(IrqKind::PsTrigger, noop).unwrap();
        registry.subscribe(IrqKind::BusFault, noop).unwrap();

        let update = registry.unsubscribe(IrqKind::PsTrigger).unwrap();
        assert_eq!(update.irq_line, None);

        let update = registry.unsubscribe(IrqKind::BusFault).unwrap();
        assert_eq!(update.irq_line, Some(false));
    }

    #[test]
    fn detect_kind_drives_the_companion_line() {
        let mut registry = SubscriptionRegistry::<Callback>::new();

        let update = registry.subscribe(IrqKind::DeviceDetect, noop).unwrap();
        assert_eq!(update.detect_line, Some(true));
        assert_eq!(update.irq_line, Some(true));

        let update = registry.unsubscribe(IrqKind::DeviceDetect).unwrap();
        assert_eq!(update.detect_line, Some(false));
        assert_eq!(update.irq_line, Some(false));
    }

    #[test]
    fn polled_kind_drives_the_timer_not_the_line() {
        let mut registry = SubscriptionRegistry::<Callback>::new();

        let update = registry.subscribe(IrqKind::AlsReport, noop).unwrap();
        assert_eq!(update.poll_timer, Some(true));
        assert_eq!(update.irq_line, None);

        let update = registry.unsubscribe(IrqKind::AlsReport).unwrap();
        assert_eq!(update.poll_timer, Some(false));
    }

    #[test]
    fn replacing_a_callback_changes_no_gates() {
        let mut registry = SubscriptionRegistry::<Callback>::new();
        registry.subscribe(IrqKind::PsTrigger, noop).unwrap();

        let update = registry.subscribe(IrqKind::PsTrigger, noop).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn unsubscribe_without_subscriber_is_idempotent() {
        let mut registry = SubscriptionRegistry::<Callback>::new();
        let update = registry
            .unsubscribe(IrqKind::AlsTrigger)
            .expect("no-subscriber unsubscribe must succeed");
        assert!(update.is_empty());
    }

    #[test]
    fn unavailable_registry_rejects_both_operations() {
        let mut registry = SubscriptionRegistry::<Callback>::unavailable();
        assert_eq!(
            registry.subscribe(IrqKind::PsTrigger, noop),
            Err(DriverError::NotReady)
        );
        assert_eq!(
            registry.unsubscribe(IrqKind::PsTrigger),
            Err(DriverError::NotReady)
        );
    }
}
