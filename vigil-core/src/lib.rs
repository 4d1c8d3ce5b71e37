//! Board-agnostic control core for the patient monitor
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Cooperative round scheduler over a fixed task arena
//! - Measurement pipeline (edge counters, polled sensors, cuff cycle)
//! - Correction of raw samples through pluggable calibration
//! - Alarm evaluation with acknowledgment windows
//! - Battery status decay
//! - EKG window buffering and frequency extraction
//! - Responder for the remote protocol
//! - Configuration type definitions and TOML subset parser
//!
//! Everything above is owned by [`system::SystemState`] and driven one
//! round at a time by [`scheduler::Scheduler::schedule`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod comms;
pub mod config;
pub mod correction;
pub mod display;
pub mod ekg;
pub mod fault;
pub mod measure;
pub mod scheduler;
pub mod status;
pub mod system;
pub mod time;

pub use fault::Fault;
pub use time::{Periodic, Tick};
