use embassy_time::{Duration, Ticker};

use super::{BOTTOM_HALF, FACTORS, GATES, WAKE};
use crate::bdic::{ALS_POLL_INTERVAL_MS, dispatch};

/// Periodic ambient-light report source.
///
/// The report type has no hardware edge, so it enters the pipeline at the
/// factor FIFO whenever the poll gate is open. Bursts coalesce in the FIFO
/// like any other factor.
#[embassy_executor::task]
pub async fn run() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(ALS_POLL_INTERVAL_MS));
    loop {
        ticker.next().await;
        if !GATES.poll_timer_enabled() {
            continue;
        }

        match dispatch::enqueue_als_report(&FACTORS) {
            Ok(()) => {
                // A failed send means a drain is already scheduled; the
                // extra hold drops here.
                let _ = BOTTOM_HALF.try_send(WAKE.acquire());
            }
            Err(_) => defmt::warn!("als: report dropped, factor queue full"),
        }
    }
}
