//! Sensor input and control output abstractions
//!
//! Analog channels return raw converter counts, digital channels return
//! `0` or `1`. Mapping counts to physical units is the job of the
//! calibration layer in the core, never of the board.

/// Input channels the monitor samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorChannel {
    /// Body temperature probe (analog)
    Temperature,
    /// EKG front-end amplitude (analog)
    Ekg,
    /// Cuff pressure transducer (analog)
    CuffPressure,
    /// Cuff inflation limit switch (digital, 1 = target pressure reached)
    CuffSwitch,
    /// Korotkoff sound detector (digital, 1 = sounds present)
    CuffSoundMark,
}

/// Output channels the monitor drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputChannel {
    /// Cuff inflation pump
    CuffPump,
    /// Cuff activity indicator LED
    CuffIndicator,
}

/// Logic level for a control output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Errors that can occur while sampling a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Channel not wired on this board
    Unavailable,
    /// ADC conversion failed or timed out
    ConversionError,
}

/// Sensor sampling capability
///
/// Takes `&mut self` because ADC reads typically require mutable access.
/// Implementations must return promptly: the caller runs inside a
/// run-to-completion scheduler round.
pub trait SensorInput {
    /// Read the raw value of a channel
    fn read_sensor(&mut self, channel: SensorChannel) -> Result<u16, SensorError>;

    /// Read a digital channel as a boolean
    fn read_flag(&mut self, channel: SensorChannel) -> Result<bool, SensorError> {
        self.read_sensor(channel).map(|v| v != 0)
    }
}

/// Control output capability
pub trait ControlOutput {
    /// Drive an output channel to the given level
    fn set_output(&mut self, channel: OutputChannel, level: Level);
}
