//! Board adapters
//!
//! Pin assignments for the bedside monitor board:
//!
//! | Signal             | Pin    |
//! |--------------------|--------|
//! | UART0 TX / RX      | 0 / 1  |
//! | Pulse edge         | 2      |
//! | Respiration edge   | 3      |
//! | Cuff limit switch  | 4      |
//! | Korotkoff mark     | 5      |
//! | Acknowledge button | 6      |
//! | Cuff pump          | 14     |
//! | Cuff indicator LED | 15     |
//! | Temperature ADC    | 26     |
//! | EKG ADC            | 27     |
//! | Cuff pressure ADC  | 28     |

use defmt::*;
use embassy_rp::adc::{Adc, Blocking, Channel};
use embassy_rp::gpio::{self, Input, Output};

use vigil_core::display::{DisplayError, DisplaySink, DisplaySnapshot};
use vigil_core::measure::Signal;
use vigil_hal::{
    ControlOutput, Level, LinkError, OutputChannel, SensorChannel, SensorError, SensorInput,
    UartRx, UartTx,
};

use crate::channels::{RX_PIPE, TX_PIPE};

/// Analog and digital front-end inputs
pub struct BoardSensors {
    pub adc: Adc<'static, Blocking>,
    pub temperature: Channel<'static>,
    pub ekg: Channel<'static>,
    pub cuff_pressure: Channel<'static>,
    pub cuff_switch: Input<'static>,
    pub sound_mark: Input<'static>,
}

impl SensorInput for BoardSensors {
    fn read_sensor(&mut self, channel: SensorChannel) -> Result<u16, SensorError> {
        let analog = match channel {
            SensorChannel::Temperature => &mut self.temperature,
            SensorChannel::Ekg => &mut self.ekg,
            SensorChannel::CuffPressure => &mut self.cuff_pressure,
            SensorChannel::CuffSwitch => return Ok(self.cuff_switch.is_high() as u16),
            SensorChannel::CuffSoundMark => return Ok(self.sound_mark.is_high() as u16),
        };
        self.adc
            .blocking_read(analog)
            .map_err(|_| SensorError::ConversionError)
    }
}

/// Cuff pump and indicator outputs
pub struct BoardOutputs {
    pub pump: Output<'static>,
    pub indicator: Output<'static>,
}

impl ControlOutput for BoardOutputs {
    fn set_output(&mut self, channel: OutputChannel, level: Level) {
        let level = match level {
            Level::High => gpio::Level::High,
            Level::Low => gpio::Level::Low,
        };
        match channel {
            OutputChannel::CuffPump => self.pump.set_level(level),
            OutputChannel::CuffIndicator => self.indicator.set_level(level),
        }
    }
}

/// Serial link backed by the UART pipes
///
/// Reads and writes never wait: the UART tasks move bytes between the
/// pipes and the wire.
#[derive(Debug, Default)]
pub struct PipeLink;

impl UartTx for PipeLink {
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        // A response is only useful whole
        if TX_PIPE.free_capacity() < data.len() {
            return Err(LinkError::TxFull);
        }
        let mut written = 0;
        while written < data.len() {
            match TX_PIPE.try_write(&data[written..]) {
                Ok(n) => written += n,
                Err(_) => return Err(LinkError::TxFull),
            }
        }
        Ok(())
    }
}

impl UartRx for PipeLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        Ok(RX_PIPE.try_read(buf).unwrap_or(0))
    }
}

/// Display sink that reports each refresh over defmt
///
/// The board has no panel; the host-side display is fed through the
/// serial link.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, snapshot: &DisplaySnapshot) -> Result<(), DisplayError> {
        debug!(
            "Display t={} temp={} bp={}/{} pulse={} resp={} ekg={} battery={}",
            snapshot.tick,
            snapshot.value(Signal::Temperature),
            snapshot.value(Signal::Systolic),
            snapshot.value(Signal::Diastolic),
            snapshot.value(Signal::Pulse),
            snapshot.value(Signal::Respiration),
            snapshot.ekg_frequency,
            snapshot.battery
        );
        if snapshot.indicators.iter().any(|&lit| lit) {
            info!("Alarm indicators: {}", snapshot.indicators);
        }
        Ok(())
    }
}
