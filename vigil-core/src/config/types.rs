//! Configuration type definitions
//!
//! Periods are in scheduler ticks. Thresholds are in corrected units, i.e.
//! they compare against the output of the calibration layer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::calibration::CalibrationTable;
use crate::time::Tick;

/// Ticks per second of the default timebase
pub const DEFAULT_TICKS_PER_SECOND: u32 = 4;

/// One second of ticks
pub const TASKDELAY_1S: Tick = 4;

/// Five seconds of ticks
pub const TASKDELAY_5S: Tick = 20;

/// Task periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Scheduler rounds per second
    pub ticks_per_second: u32,
    /// Pulse edge count conversion period
    pub pulse_period: Tick,
    /// Respiration edge count conversion period
    pub respiration_period: Tick,
    /// Temperature sampling period
    pub temperature_period: Tick,
    /// Cuff state machine polling period
    pub pressure_period: Tick,
    /// EKG block acquisition period
    pub ekg_period: Tick,
    /// Correction period
    pub compute_period: Tick,
    /// Alarm evaluation period
    pub warning_period: Tick,
    /// Battery decay period
    pub status_period: Tick,
    /// Local display refresh period
    pub display_period: Tick,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            pulse_period: 2,
            respiration_period: 4,
            temperature_period: TASKDELAY_1S,
            pressure_period: 1,
            ekg_period: 19,
            compute_period: 3,
            warning_period: TASKDELAY_1S,
            status_period: TASKDELAY_5S,
            display_period: TASKDELAY_1S,
        }
    }
}

/// Alarm thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdConfig {
    /// Temperature above this is high
    pub temperature_max: u32,
    /// Systolic above this trips blood pressure
    pub systolic_max: u32,
    /// Diastolic above this trips blood pressure
    pub diastolic_max: u32,
    /// Pulse below this is low
    pub pulse_min: u32,
    /// Battery below this is low
    pub battery_min: u16,
    /// EKG frequency (Hz) above this is high
    pub ekg_freq_max: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature_max: 38,
            systolic_max: 130,
            diastolic_max: 90,
            pulse_min: 60,
            battery_min: 40,
            ekg_freq_max: 3750,
        }
    }
}

/// Acknowledgment and annunciation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlarmConfig {
    /// Ticks an acknowledgment keeps alarms suppressed
    pub ack_window: Tick,
    /// Blink half-period of the battery indicator
    pub battery_blink: Tick,
    /// Blink half-period of the EKG indicator
    pub ekg_blink: Tick,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            ack_window: TASKDELAY_5S,
            battery_blink: 8,
            ekg_blink: 2,
        }
    }
}

/// Battery model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatteryConfig {
    /// Level at boot
    pub initial: u16,
    /// Level never decays below this
    pub floor: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            initial: 200,
            floor: 0,
        }
    }
}

/// Cuff measurement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PressureConfig {
    /// Raw cuff pressure below which an unfinished cycle is abandoned
    pub release_floor: u16,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self { release_floor: 20 }
    }
}

/// EKG acquisition settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EkgConfig {
    /// Rate at which the front end is sampled within a block
    pub sample_rate_hz: u32,
    /// Right shift from ADC counts to 8-bit samples
    pub sample_shift: u8,
}

impl Default for EkgConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 8000,
            sample_shift: 4,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorConfig {
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub alarm: AlarmConfig,
    pub battery: BatteryConfig,
    pub pressure: PressureConfig,
    pub ekg: EkgConfig,
    pub calibration: CalibrationTable,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::config::LinearCalibration;
    use crate::measure::Signal;

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = MonitorConfig::new();
        config.timing.ticks_per_second = 8;
        config.alarm.ack_window = 40;
        config
            .calibration
            .set(Signal::Systolic, LinearCalibration::new(9, 2, 1).unwrap());

        let mut buf = [0u8; 256];
        let bytes = postcard::to_slice(&config, &mut buf).unwrap();
        let decoded: MonitorConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
