//! Edge counting tasks
//!
//! One instance per interrupt-driven signal. Each rising edge bumps the
//! counter the measure task converts into a rate.

use defmt::*;
use embassy_rp::gpio::Input;

use vigil_core::measure::EdgeCounter;

/// Count rising edges on `pin`
#[embassy_executor::task(pool_size = 2)]
pub async fn edge_task(mut pin: Input<'static>, counter: &'static EdgeCounter, name: &'static str) {
    info!("Edge task started: {}", name);

    loop {
        pin.wait_for_rising_edge().await;
        counter.record_edge();
    }
}
