//! Blood pressure cuff cycle
//!
//! One cycle inflates the cuff until the cuff switch reports full
//! pressure, then deflates while watching the sound-mark input. The
//! pressure at the first mark is systolic; the pressure at the last mark
//! before they stop is diastolic. The readiness of each reading is
//! published in [`MeasureFlags`] so interrupt-side code and the protocol
//! can observe it.

use vigil_hal::{ControlOutput, Level, OutputChannel, SensorChannel, SensorError, SensorInput};

use super::edge::MeasureFlags;

/// Where the cuff is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CuffPhase {
    Idle,
    Inflating,
    Deflating {
        systolic: Option<u16>,
        diastolic: Option<u16>,
        /// Pressure at the most recent sound mark
        last_mark: Option<u16>,
    },
}

/// Result of one poll of the cuff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CuffOutcome {
    /// Cycle still running
    Pending,
    /// Both readings latched; the cycle is over
    Complete { systolic: u16, diastolic: u16 },
    /// Cuff released before both readings were taken
    Abandoned,
}

const READY: u8 = MeasureFlags::SYST_READY | MeasureFlags::DIAS_READY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureCycle {
    phase: CuffPhase,
    release_floor: u16,
}

impl PressureCycle {
    pub const fn new(release_floor: u16) -> Self {
        Self {
            phase: CuffPhase::Idle,
            release_floor,
        }
    }

    pub fn phase(&self) -> CuffPhase {
        self.phase
    }

    /// Advance the cycle by one poll
    pub fn poll<S, O>(
        &mut self,
        sensor: &mut S,
        output: &mut O,
        flags: &MeasureFlags,
    ) -> Result<CuffOutcome, SensorError>
    where
        S: SensorInput,
        O: ControlOutput,
    {
        match self.phase {
            CuffPhase::Idle => {
                flags.clear(READY);
                output.set_output(OutputChannel::CuffIndicator, Level::High);
                output.set_output(OutputChannel::CuffPump, Level::High);
                self.phase = CuffPhase::Inflating;
                Ok(CuffOutcome::Pending)
            }
            CuffPhase::Inflating => {
                if sensor.read_flag(SensorChannel::CuffSwitch)? {
                    output.set_output(OutputChannel::CuffPump, Level::Low);
                    self.phase = CuffPhase::Deflating {
                        systolic: None,
                        diastolic: None,
                        last_mark: None,
                    };
                }
                Ok(CuffOutcome::Pending)
            }
            CuffPhase::Deflating {
                mut systolic,
                mut diastolic,
                mut last_mark,
            } => {
                let pressure = sensor.read_sensor(SensorChannel::CuffPressure)?;
                let mark = sensor.read_flag(SensorChannel::CuffSoundMark)?;

                if mark {
                    if systolic.is_none() {
                        systolic = Some(pressure);
                        flags.set(MeasureFlags::SYST_READY);
                    }
                    last_mark = Some(pressure);
                } else if systolic.is_some() && diastolic.is_none() {
                    diastolic = last_mark;
                    flags.set(MeasureFlags::DIAS_READY);
                }

                if let (Some(systolic), Some(diastolic)) = (systolic, diastolic) {
                    self.finish(output, flags);
                    return Ok(CuffOutcome::Complete {
                        systolic,
                        diastolic,
                    });
                }

                if pressure < self.release_floor {
                    warn!("cuff released at {} without both readings", pressure);
                    self.finish(output, flags);
                    return Ok(CuffOutcome::Abandoned);
                }

                self.phase = CuffPhase::Deflating {
                    systolic,
                    diastolic,
                    last_mark,
                };
                Ok(CuffOutcome::Pending)
            }
        }
    }

    /// Stop the cycle and vent the cuff
    pub fn abort<O: ControlOutput>(&mut self, output: &mut O, flags: &MeasureFlags) {
        if self.phase != CuffPhase::Idle {
            debug!("cuff cycle aborted");
        }
        output.set_output(OutputChannel::CuffPump, Level::Low);
        self.finish(output, flags);
    }

    fn finish<O: ControlOutput>(&mut self, output: &mut O, flags: &MeasureFlags) {
        output.set_output(OutputChannel::CuffIndicator, Level::Low);
        flags.clear(READY);
        self.phase = CuffPhase::Idle;
    }
}
