//! Vigil Hardware Abstraction Layer
//!
//! This crate defines the narrow interfaces the monitor core uses to reach
//! the board. The core never touches registers; a board crate implements
//! these traits over its own peripherals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  vigil-core (scheduler, pipeline, ...)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  vigil-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  vigil-firmware board adapters (RP2040) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`io::SensorInput`] - `read_sensor(channel) -> raw value`
//! - [`io::ControlOutput`] - `set_output(channel, level)`
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial link to the remote station

#![no_std]
#![deny(unsafe_code)]

pub mod io;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use io::{ControlOutput, Level, OutputChannel, SensorChannel, SensorError, SensorInput};
pub use uart::{LinkError, Uart, UartRx, UartTx};
