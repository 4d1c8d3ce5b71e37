//! Sampling helpers shared by the measurement tasks

use vigil_hal::{SensorChannel, SensorError, SensorInput};

use crate::config::TimingConfig;
use crate::ekg::EKG_BLOCK_LEN;
use crate::time::{Periodic, Tick};

/// Convert an edge count gathered over `period` ticks into a per-minute rate
pub fn edge_rate(count: u32, period: Tick, ticks_per_second: u32) -> u32 {
    let per_minute = count as u64 * ticks_per_second as u64 * 60 / period.max(1) as u64;
    per_minute.min(u32::MAX as u64) as u32
}

/// Sample the temperature input once
pub fn read_temperature<S: SensorInput>(sensor: &mut S) -> Result<u32, SensorError> {
    sensor.read_sensor(SensorChannel::Temperature).map(u32::from)
}

/// Sample one EKG block, scaling ADC counts to bytes
pub fn read_ekg_block<S: SensorInput>(
    sensor: &mut S,
    shift: u8,
) -> Result<[u8; EKG_BLOCK_LEN], SensorError> {
    let mut block = [0u8; EKG_BLOCK_LEN];
    for sample in block.iter_mut() {
        let raw = sensor.read_sensor(SensorChannel::Ekg)?;
        *sample = (raw >> shift.min(15)).min(u8::MAX as u16) as u8;
    }
    Ok(block)
}

/// Periods of the acquisition tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasureTimers {
    pub pulse: Periodic,
    pub respiration: Periodic,
    pub temperature: Periodic,
    pub pressure: Periodic,
    pub ekg: Periodic,
}

impl MeasureTimers {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            pulse: Periodic::new(timing.pulse_period),
            respiration: Periodic::new(timing.respiration_period),
            temperature: Periodic::new(timing.temperature_period),
            pressure: Periodic::new(timing.pressure_period),
            ekg: Periodic::new(timing.ekg_period),
        }
    }
}
