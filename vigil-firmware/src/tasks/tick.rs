//! Tick task
//!
//! Paces the scheduler: one round per tick.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use crate::channels::TICK_SIGNAL;

/// Tick task - signals the monitor task once per interval
#[embassy_executor::task]
pub async fn tick_task(interval_ms: u64) {
    info!("Tick task started ({} ms)", interval_ms);

    let mut ticker = Ticker::every(Duration::from_millis(interval_ms));
    let start = Instant::now();

    loop {
        ticker.next().await;
        TICK_SIGNAL.signal(start.elapsed().as_millis() as u32);
    }
}
