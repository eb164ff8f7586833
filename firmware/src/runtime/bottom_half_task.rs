use super::{BOTTOM_HALF, FACTORS, LINE_REENABLE, RECOVERY_STATE, REGISTRY};
use crate::bdic::{dispatch, recovery};

/// Deferred bottom half: drain the factor FIFO and invoke subscribers.
///
/// Callbacks run with no lock held, so a bus-fault callback can arm a
/// recovery pass from here. The line re-arms only when no pass is pending;
/// otherwise the recovery task re-arms it after cleanup.
#[embassy_executor::task]
pub async fn run() -> ! {
    loop {
        let lease = BOTTOM_HALF.receive().await;

        let dispatched = dispatch::drain_bottom_half(&FACTORS, &REGISTRY);
        if dispatched > 0 {
            defmt::debug!("irq: dispatched {} events", dispatched);
        }

        if !recovery::pass_queued(&RECOVERY_STATE) {
            LINE_REENABLE.signal(());
        }

        drop(lease);
    }
}
