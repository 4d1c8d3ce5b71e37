//! Battery status
//!
//! The battery model is a counter that loses one unit per status period
//! and never drops below its floor.

use crate::config::BatteryConfig;
use crate::time::{Periodic, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryState {
    level: u16,
    floor: u16,
    decay: Periodic,
}

impl BatteryState {
    pub fn new(config: &BatteryConfig, period: Tick) -> Self {
        Self {
            level: config.initial.max(config.floor),
            floor: config.floor,
            decay: Periodic::new(period),
        }
    }

    pub fn level(&self) -> u16 {
        self.level
    }

    /// Run the status task at `now`
    ///
    /// Decrements once the period has elapsed since the last decrement.
    /// Returns true if the level changed.
    pub fn update(&mut self, now: Tick) -> bool {
        if !self.decay.due(now) || self.level <= self.floor {
            return false;
        }
        self.level -= 1;
        if self.level == self.floor {
            warn!("battery at floor {}", self.floor);
        }
        true
    }
}
