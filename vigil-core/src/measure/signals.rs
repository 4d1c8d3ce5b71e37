//! Signal identities and the measurement select mask

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A buffered vital sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Signal {
    Temperature,
    Systolic,
    Diastolic,
    Pulse,
    Respiration,
}

impl Signal {
    pub const COUNT: usize = 5;

    pub const ALL: [Signal; Self::COUNT] = [
        Signal::Temperature,
        Signal::Systolic,
        Signal::Diastolic,
        Signal::Pulse,
        Signal::Respiration,
    ];

    /// Stable index into per-signal tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in configuration section headers
    pub fn name(self) -> &'static str {
        match self {
            Signal::Temperature => "temperature",
            Signal::Systolic => "systolic",
            Signal::Diastolic => "diastolic",
            Signal::Pulse => "pulse",
            Signal::Respiration => "respiration",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Select bit that enables this signal
    pub fn select_bit(self) -> u16 {
        match self {
            Signal::Temperature => MeasurementSelect::TEMPERATURE,
            Signal::Systolic | Signal::Diastolic => MeasurementSelect::PRESSURE,
            Signal::Pulse => MeasurementSelect::PULSE,
            Signal::Respiration => MeasurementSelect::RESPIRATION,
        }
    }
}

/// Which measurements are enabled
///
/// Changed only by explicit start/stop commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementSelect(u16);

impl MeasurementSelect {
    pub const EKG: u16 = 1 << 3;
    pub const TEMPERATURE: u16 = 1 << 4;
    pub const PRESSURE: u16 = 1 << 5;
    pub const PULSE: u16 = 1 << 6;
    pub const RESPIRATION: u16 = 1 << 7;
    pub const ALL: u16 =
        Self::EKG | Self::TEMPERATURE | Self::PRESSURE | Self::PULSE | Self::RESPIRATION;

    /// Build from wire bits; bits outside [`Self::ALL`] are dropped
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn enable(&mut self, mask: u16) {
        self.0 |= mask & Self::ALL;
    }

    pub fn disable(&mut self, mask: u16) {
        self.0 &= !mask;
    }

    /// True if every bit of `mask` is enabled
    pub fn contains(self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    pub fn is_enabled(self, signal: Signal) -> bool {
        self.contains(signal.select_bit())
    }
}

impl Default for MeasurementSelect {
    fn default() -> Self {
        Self(Self::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names_roundtrip() {
        for signal in Signal::ALL {
            assert_eq!(Signal::from_name(signal.name()), Some(signal));
        }
        assert_eq!(Signal::from_name("ekg"), None);
    }

    #[test]
    fn test_pressure_bit_covers_both_readings() {
        let mut select = MeasurementSelect::default();
        select.disable(MeasurementSelect::PRESSURE);
        assert!(!select.is_enabled(Signal::Systolic));
        assert!(!select.is_enabled(Signal::Diastolic));
        assert!(select.is_enabled(Signal::Pulse));
    }

    #[test]
    fn test_select_ignores_unknown_bits() {
        let select = MeasurementSelect::from_bits(0xFFFF);
        assert_eq!(select.bits(), MeasurementSelect::ALL);

        let mut select = MeasurementSelect::from_bits(0);
        select.enable(1 << 0 | MeasurementSelect::PULSE);
        assert_eq!(select.bits(), MeasurementSelect::PULSE);
    }
}
