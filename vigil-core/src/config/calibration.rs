//! Raw-to-corrected calibration
//!
//! The correction engine only knows the [`Calibrate`] trait. The shipped
//! transform is linear: `offset + raw * num / den`, in integer arithmetic,
//! saturating at the bounds of `u32`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::measure::Signal;

/// Maps a raw sample of a signal to its corrected value
pub trait Calibrate {
    fn correct(&self, signal: Signal, raw: u32) -> u32;
}

/// Linear transform for one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearCalibration {
    pub offset: i32,
    pub num: i32,
    /// Never zero
    pub den: u32,
}

impl LinearCalibration {
    /// Leaves samples unchanged
    pub const IDENTITY: Self = Self {
        offset: 0,
        num: 1,
        den: 1,
    };

    /// Returns `None` for a zero denominator
    pub const fn new(offset: i32, num: i32, den: u32) -> Option<Self> {
        if den == 0 {
            None
        } else {
            Some(Self { offset, num, den })
        }
    }

    pub fn apply(&self, raw: u32) -> u32 {
        let scaled = raw as i64 * self.num as i64 / self.den.max(1) as i64;
        (self.offset as i64 + scaled).clamp(0, u32::MAX as i64) as u32
    }
}

impl Default for LinearCalibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One linear transform per signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationTable {
    entries: [LinearCalibration; Signal::COUNT],
}

impl CalibrationTable {
    pub fn get(&self, signal: Signal) -> &LinearCalibration {
        &self.entries[signal.index()]
    }

    pub fn set(&mut self, signal: Signal, calibration: LinearCalibration) {
        self.entries[signal.index()] = calibration;
    }

    pub fn get_mut(&mut self, signal: Signal) -> &mut LinearCalibration {
        &mut self.entries[signal.index()]
    }
}

impl Calibrate for CalibrationTable {
    fn correct(&self, signal: Signal, raw: u32) -> u32 {
        self.get(signal).apply(raw)
    }
}
