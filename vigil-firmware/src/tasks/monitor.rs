//! Monitor task
//!
//! Runs one scheduler round per tick. A fault halts the scheduler; after
//! logging it the controller is reset.

use defmt::*;
use embassy_time::{Duration, Timer};

use vigil_core::scheduler::Scheduler;
use vigil_core::system::{Monitor, MonitorTask};

use crate::boards::{BoardOutputs, BoardSensors, LogDisplay, PipeLink};
use crate::channels::TICK_SIGNAL;

/// The monitor wired to this board's peripherals
pub type BoardMonitor = Monitor<'static, BoardSensors, BoardOutputs, PipeLink, LogDisplay>;

/// Time given to the RTT probe to drain the fault log before reset
const FAULT_FLUSH_MS: u64 = 100;

/// Monitor task - drives the cooperative scheduler
#[embassy_executor::task]
pub async fn monitor_task(
    scheduler: &'static mut Scheduler<MonitorTask>,
    monitor: &'static mut BoardMonitor,
) {
    info!("Monitor task started");

    loop {
        let uptime_ms = TICK_SIGNAL.wait().await;

        if let Err(fault) = scheduler.schedule(&mut *monitor) {
            error!("Monitor fault at {} ms: {}", uptime_ms, fault);
            Timer::after(Duration::from_millis(FAULT_FLUSH_MS)).await;
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}
