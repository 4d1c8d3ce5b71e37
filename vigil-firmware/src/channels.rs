//! State shared between Embassy tasks
//!
//! Interrupt-side tasks only touch atomics; the monitor task owns
//! everything else. Serial bytes cross between the UART tasks and the
//! scheduler round through two pipes, so the round never awaits.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;

use vigil_core::measure::{Edges, MeasureFlags};
use vigil_core::system::Keypad;

/// Capacity of each serial pipe
pub const PIPE_SIZE: usize = 256;

/// Pulse and respiration edge counters
pub static EDGES: Edges = Edges::new();

/// Measurement progress flags
pub static FLAGS: MeasureFlags = MeasureFlags::new(0);

/// Local acknowledge button
pub static KEYPAD: Keypad = Keypad::new();

/// Bytes received from the host, waiting for the comms task
pub static RX_PIPE: Pipe<CriticalSectionRawMutex, PIPE_SIZE> = Pipe::new();

/// Encoded responses waiting for the UART
pub static TX_PIPE: Pipe<CriticalSectionRawMutex, PIPE_SIZE> = Pipe::new();

/// Raised once per scheduler tick with the uptime in milliseconds
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, u32> = Signal::new();
