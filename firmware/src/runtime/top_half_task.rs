use super::{BOTTOM_HALF, FACTORS, LINE_REENABLE, WAKE};
use crate::bdic::{CoreLock, dispatch};
use crate::hw::bus::BdicI2cBus;

/// Deferred top half: latch, enumerate, acknowledge.
///
/// Holds the sequencer lock only for the factor read and the latch clear.
/// The wake hold received from the line task is released once the batch is
/// either enumerated into the FIFO (a fresh hold rides to the bottom half)
/// or found empty.
#[embassy_executor::task]
pub async fn run(core: &'static CoreLock<BdicI2cBus<'static>>) -> ! {
    loop {
        let lease = TOP_HALF.receive().await;

        let outcome = {
            let mut core = core.lock().await;
            dispatch::top_half_pass(&mut core, &FACTORS)
        };

        match outcome {
            Ok(outcome) => {
                if outcome.schedule_bottom_half {
                    // A failed send means a drain is already scheduled and
                    // will see the new nodes; the extra hold drops here.
                    let _ = BOTTOM_HALF.try_send(WAKE.acquire());
                }
                if outcome.reenable_line {
                    LINE_REENABLE.signal(());
                }
            }
            Err(err) => {
                defmt::warn!("irq: factor latch read failed ({=str})", err.as_str());
                LINE_REENABLE.signal(());
            }
        }

        drop(lease);
    }
}
