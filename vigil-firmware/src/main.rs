//! Vigil - Patient Monitor Firmware
//!
//! Main firmware binary for RP2040-based bedside monitors. A cooperative
//! scheduler runs the measurement, correction, alarm, display, status,
//! keypad, serial and EKG tasks once per tick; Embassy tasks around it
//! pace the ticks and feed it edges, button presses and serial bytes.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use vigil_core::scheduler::Scheduler;
use vigil_core::system::{install, Monitor, MonitorTask, SystemState};

use crate::boards::{BoardOutputs, BoardSensors, LogDisplay, PipeLink};
use crate::channels::{EDGES, FLAGS, KEYPAD};
use crate::config::{load_config, tick_interval_ms};
use crate::tasks::BoardMonitor;

mod boards;
mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

// The scheduler and its context outlive every round
static SCHEDULER: StaticCell<Scheduler<MonitorTask>> = StaticCell::new();
static MONITOR: StaticCell<BoardMonitor> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Vigil firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    let interval_ms = tick_interval_ms(&config);
    info!("Tick interval {} ms", interval_ms);

    // Host link (115200 baud default)
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for host link");

    // Front end
    let sensors = BoardSensors {
        adc: Adc::new_blocking(p.ADC, embassy_rp::adc::Config::default()),
        temperature: Channel::new_pin(p.PIN_26, Pull::None),
        ekg: Channel::new_pin(p.PIN_27, Pull::None),
        cuff_pressure: Channel::new_pin(p.PIN_28, Pull::None),
        cuff_switch: Input::new(p.PIN_4, Pull::Down),
        sound_mark: Input::new(p.PIN_5, Pull::Down),
    };
    let outputs = BoardOutputs {
        pump: Output::new(p.PIN_14, Level::Low),
        indicator: Output::new(p.PIN_15, Level::Low),
    };
    let pulse = Input::new(p.PIN_2, Pull::Down);
    let respiration = Input::new(p.PIN_3, Pull::Down);
    let button = Input::new(p.PIN_6, Pull::Up);
    info!("Front end initialized");

    let scheduler = SCHEDULER.init(Scheduler::new());
    if let Err(fault) = install(scheduler) {
        // Only reachable if the task table outgrows the arena
        error!("Task table rejected: {}", fault);
        cortex_m::peripheral::SCB::sys_reset();
    }

    let state = SystemState::new(config, &EDGES, &FLAGS, &KEYPAD);
    let monitor = MONITOR.init(Monitor::new(state, sensors, outputs, PipeLink, LogDisplay));

    // Spawn tasks
    spawner.spawn(tasks::tick_task(interval_ms)).unwrap();
    spawner.spawn(tasks::uart_rx_task(rx)).unwrap();
    spawner.spawn(tasks::uart_tx_task(tx)).unwrap();
    spawner
        .spawn(tasks::edge_task(pulse, &EDGES.pulse, "pulse"))
        .unwrap();
    spawner
        .spawn(tasks::edge_task(respiration, &EDGES.respiration, "respiration"))
        .unwrap();
    spawner.spawn(tasks::button_task(button)).unwrap();
    spawner.spawn(tasks::monitor_task(scheduler, monitor)).unwrap();

    info!("All tasks spawned, monitor running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
