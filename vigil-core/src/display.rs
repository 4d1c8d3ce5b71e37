//! Local display output
//!
//! Rendering is outside the core. The display task hands the sink a
//! [`DisplaySnapshot`] of corrected values and alarm indicators; what
//! the sink draws with it is up to the board.

use crate::alarm::{AlarmMonitor, Condition};
use crate::measure::{MeasurementBuffers, Signal};
use crate::time::Tick;

/// Errors a display sink may report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Previous frame still being sent
    Busy,
    /// Display not responding
    LinkLost,
}

/// Everything the display shows for one refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplaySnapshot {
    pub tick: Tick,
    /// Latest corrected value per [`Signal`]
    pub values: [Option<u32>; Signal::COUNT],
    pub ekg_frequency: Option<u32>,
    pub battery: u16,
    /// Indicator lamp per [`Condition`], blink phase already applied
    pub indicators: [bool; Condition::COUNT],
    /// Remote display mirroring enabled
    pub remote: bool,
}

impl DisplaySnapshot {
    pub fn capture(
        tick: Tick,
        buffers: &MeasurementBuffers,
        alarms: &AlarmMonitor,
        ekg_frequency: Option<u32>,
        battery: u16,
        remote: bool,
    ) -> Self {
        let mut values = [None; Signal::COUNT];
        for signal in Signal::ALL {
            values[signal.index()] = buffers.latest_corrected(signal);
        }
        let mut indicators = [false; Condition::COUNT];
        for condition in Condition::ALL {
            indicators[condition.index()] = alarms.indicator(condition, tick);
        }
        Self {
            tick,
            values,
            ekg_frequency,
            battery,
            indicators,
            remote,
        }
    }

    pub fn value(&self, signal: Signal) -> Option<u32> {
        self.values[signal.index()]
    }
}

/// Receives display refreshes
pub trait DisplaySink {
    fn show(&mut self, snapshot: &DisplaySnapshot) -> Result<(), DisplayError>;
}

/// Sink for boards without a display
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&mut self, _snapshot: &DisplaySnapshot) -> Result<(), DisplayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmInputs;
    use crate::config::{AlarmConfig, ThresholdConfig};

    #[test]
    fn test_capture() {
        let mut buffers = MeasurementBuffers::new();
        buffers.publish(Signal::Pulse, 50).unwrap();
        buffers.get_mut(Signal::Pulse).correct_pending(|v| v);

        let mut alarms = AlarmMonitor::new(ThresholdConfig::default(), AlarmConfig::default());
        alarms.evaluate(
            8,
            &AlarmInputs {
                pulse: Some(50),
                battery: 200,
                ..Default::default()
            },
        );

        let snapshot = DisplaySnapshot::capture(8, &buffers, &alarms, Some(500), 200, false);
        assert_eq!(snapshot.value(Signal::Pulse), Some(50));
        assert_eq!(snapshot.value(Signal::Temperature), None);
        assert!(snapshot.indicators[Condition::Pulse.index()]);
        assert!(!snapshot.indicators[Condition::Battery.index()]);
        assert_eq!(snapshot.ekg_frequency, Some(500));
    }
}
