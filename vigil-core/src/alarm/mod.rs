//! Alarm evaluation
//!
//! Threshold checks over the latest corrected values, per-condition
//! hysteresis state, strike counters and the acknowledgment window.

mod monitor;

pub use monitor::{AckRecord, AlarmInputs, AlarmMonitor, Condition, ConditionState};
