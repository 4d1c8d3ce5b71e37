//! Acknowledge button task

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Timer};

use crate::channels::KEYPAD;

/// Contact bounce settle time
const DEBOUNCE_MS: u64 = 20;

/// Button task - active-low push button with pull-up
#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>) {
    info!("Button task started");

    loop {
        button.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;

        if button.is_low() {
            debug!("Acknowledge pressed");
            KEYPAD.press_ack();
        }

        button.wait_for_high().await;
    }
}
