use super::BACKLIGHT;
use crate::bdic::{CoreLock, backlight};
use crate::hw::bus::BdicI2cBus;

/// Applies backlight brightness requests, newest wins.
///
/// A burst of requests collapses to the latest level before the sequencer
/// lock is taken, so a slow bus never backs brightness changes up behind
/// stale intermediate levels.
#[embassy_executor::task]
pub async fn run(core: &'static CoreLock<BdicI2cBus<'static>>) -> ! {
    loop {
        let mut level = BACKLIGHT.receive().await;
        while let Ok(next) = BACKLIGHT.try_receive() {
            level = next;
        }

        let mut core = core.lock().await;
        let _ = backlight::apply_backlight(&mut core, level);
    }
}
