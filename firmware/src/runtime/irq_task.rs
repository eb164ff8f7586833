use embassy_stm32::exti::ExtiInput;

use super::{GATES, LINE_REENABLE, TOP_HALF, WAKE};

/// Shared interrupt line front half.
///
/// The line stays unarmed from the moment an edge is taken until the
/// pipeline pulses [`LINE_REENABLE`], so a storming device cannot outrun
/// the factor FIFO. The wake hold taken here travels to the top half as
/// the channel message.
#[embassy_executor::task]
pub async fn run(mut line: ExtiInput<'static>) -> ! {
    loop {
        while !GATES.irq_line_enabled() {
            LINE_REENABLE.wait().await;
        }
        line.wait_for_falling_edge().await;
        TOP_HALF.send(WAKE.acquire()).await;
        LINE_REENABLE.wait().await;
    }
}

/// Companion detect line.
///
/// Detect events also latch into the factor register, so an edge here only
/// nudges the pipeline; the factor read happens on the shared path.
#[embassy_executor::task]
pub async fn run_detect(mut line: ExtiInput<'static>) -> ! {
    loop {
        line.wait_for_falling_edge().await;
        if !GATES.detect_line_enabled() {
            continue;
        }
        TOP_HALF.send(WAKE.acquire()).await;
    }
}
