//! Simple TOML parser for monitor configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the monitor configuration. Anything beyond that subset is rejected or ignored.
//!
//! Supported features:
//! - Key = value pairs (integer, boolean)
//! - [section] headers
//! - [calibration.signal] headers
//! - Comments (# ...)
//!
//! Unknown keys are ignored; unknown sections are an error.

use super::calibration::LinearCalibration;
use super::types::MonitorConfig;
use crate::measure::Signal;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Key outside of any section
    KeyOutsideSection,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Timing,
    Thresholds,
    Alarm,
    Battery,
    Pressure,
    Ekg,
    Calibration(Signal),
}

/// Parse TOML configuration into MonitorConfig
///
/// Keys that are absent keep their defaults.
pub fn parse_config(input: &str) -> Result<MonitorConfig, ParseError> {
    let mut config = MonitorConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let header = strip_comment(header)
                .strip_suffix(']')
                .ok_or(ParseError::InvalidSection)?;
            section = parse_section_header(header)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config)?;
    }

    // Calibration sections may be partial; reject a zero denominator left behind
    for signal in Signal::ALL {
        if config.calibration.get(signal).den == 0 {
            return Err(ParseError::InvalidValue);
        }
    }

    Ok(config)
}

/// Parse section header like "timing" or "calibration.temperature"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    if let Some((kind, name)) = header.split_once('.') {
        if kind.trim() != "calibration" {
            return Err(ParseError::InvalidSection);
        }
        let signal = Signal::from_name(name.trim()).ok_or(ParseError::InvalidSection)?;
        return Ok(Section::Calibration(signal));
    }

    match header {
        "timing" => Ok(Section::Timing),
        "thresholds" => Ok(Section::Thresholds),
        "alarm" => Ok(Section::Alarm),
        "battery" => Ok(Section::Battery),
        "pressure" => Ok(Section::Pressure),
        "ekg" => Ok(Section::Ekg),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing `# comment`
fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(pos) => text[..pos].trim(),
        None => text.trim(),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = strip_comment(value);

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse an integer value, allowing `_` digit separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let mut digits: heapless::String<24> = heapless::String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MonitorConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => return Err(ParseError::KeyOutsideSection),
        Section::Timing => {
            let t = &mut config.timing;
            match key {
                "ticks_per_second" => {
                    t.ticks_per_second = parse_int(value)?;
                    if t.ticks_per_second == 0 {
                        return Err(ParseError::InvalidValue);
                    }
                }
                "pulse_period" => t.pulse_period = parse_int(value)?,
                "respiration_period" => t.respiration_period = parse_int(value)?,
                "temperature_period" => t.temperature_period = parse_int(value)?,
                "pressure_period" => t.pressure_period = parse_int(value)?,
                "ekg_period" => t.ekg_period = parse_int(value)?,
                "compute_period" => t.compute_period = parse_int(value)?,
                "warning_period" => t.warning_period = parse_int(value)?,
                "status_period" => t.status_period = parse_int(value)?,
                "display_period" => t.display_period = parse_int(value)?,
                _ => {} // Ignore unknown keys
            }
        }
        Section::Thresholds => {
            let t = &mut config.thresholds;
            match key {
                "temperature_max" => t.temperature_max = parse_int(value)?,
                "systolic_max" => t.systolic_max = parse_int(value)?,
                "diastolic_max" => t.diastolic_max = parse_int(value)?,
                "pulse_min" => t.pulse_min = parse_int(value)?,
                "battery_min" => t.battery_min = parse_int(value)?,
                "ekg_freq_max" => t.ekg_freq_max = parse_int(value)?,
                _ => {}
            }
        }
        Section::Alarm => {
            let a = &mut config.alarm;
            match key {
                "ack_window" => a.ack_window = parse_int(value)?,
                "battery_blink" => a.battery_blink = parse_int(value)?,
                "ekg_blink" => a.ekg_blink = parse_int(value)?,
                _ => {}
            }
        }
        Section::Battery => {
            let b = &mut config.battery;
            match key {
                "initial" => b.initial = parse_int(value)?,
                "floor" => b.floor = parse_int(value)?,
                _ => {}
            }
            if b.floor > b.initial {
                return Err(ParseError::InvalidValue);
            }
        }
        Section::Pressure => {
            if key == "release_floor" {
                config.pressure.release_floor = parse_int(value)?;
            }
        }
        Section::Ekg => {
            let e = &mut config.ekg;
            match key {
                "sample_rate_hz" => e.sample_rate_hz = parse_int(value)?,
                "sample_shift" => {
                    e.sample_shift = parse_int(value)?;
                    if e.sample_shift > 15 {
                        return Err(ParseError::InvalidValue);
                    }
                }
                _ => {}
            }
        }
        Section::Calibration(signal) => {
            let c: &mut LinearCalibration = config.calibration.get_mut(signal);
            match key {
                "offset" => c.offset = parse_int(value)?,
                "num" => c.num = parse_int(value)?,
                "den" => c.den = parse_int(value)?,
                _ => {}
            }
        }
    }

    Ok(())
}
