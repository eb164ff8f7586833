use bdic_core::recovery::RecoveryNotifier;
use embassy_time::{Duration, Timer};

use super::{LINE_REENABLE, RECOVERY, RECOVERY_STATE, STATUS};
use crate::bdic::{CoreLock, MirrorSink, RECOVERY_NOTIFY_DELAY_MS, recovery};
use crate::hw::bus::BdicI2cBus;

/// Upstream proximity consumer, told to pause handling around the pass.
struct ProximityConsumer;

impl RecoveryNotifier for ProximityConsumer {
    fn recovery_starting(&mut self) {
        defmt::info!("recovery: pausing proximity consumer");
    }

    fn recovery_complete(&mut self) {
        defmt::info!("recovery: resuming proximity consumer");
    }
}

/// Bus-fault recovery pass.
///
/// At most one pass is ever queued; further faults coalesce into it. The
/// pass holds the sequencer lock for the whole power cycle so no sensor or
/// backlight request interleaves with the cleanup. The shared interrupt
/// line re-arms only when the pass reports overall success.
#[embassy_executor::task]
pub async fn run(core: &'static CoreLock<BdicI2cBus<'static>>) -> ! {
    let mut notifier = ProximityConsumer;
    loop {
        let lease = RECOVERY.receive().await;
        let snapshot = recovery::armed_snapshot(&RECOVERY_STATE);

        if snapshot.ps_on {
            notifier.recovery_starting();
        }

        let outcome = {
            let mut core = core.lock().await;
            let mut sink = MirrorSink::new(&STATUS);
            recovery::run_pass(&mut core, snapshot, &mut sink)
        };

        recovery::finish_pass(&RECOVERY_STATE);

        match outcome {
            Ok(()) => {
                defmt::info!(
                    "recovery: pass complete, restored ps={} als={}",
                    snapshot.ps_on,
                    snapshot.als_on
                );
                LINE_REENABLE.signal(());
            }
            Err(err) => {
                defmt::warn!("recovery: pass finished with {=str}", err.as_str());
            }
        }

        if snapshot.ps_on {
            Timer::after(Duration::from_millis(RECOVERY_NOTIFY_DELAY_MS)).await;
            notifier.recovery_complete();
        }

        drop(lease);
    }
}
