//! Build script for vigil-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates monitor.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Signals that may carry a `[calibration.*]` section
const CALIBRATED_SIGNALS: [&str; 5] = ["temperature", "systolic", "diastolic", "pulse", "respiration"];

/// Timing keys that must be non-zero when present
const PERIOD_KEYS: [&str; 10] = [
    "ticks_per_second",
    "pulse_period",
    "respiration_period",
    "temperature_period",
    "pressure_period",
    "ekg_period",
    "compute_period",
    "warning_period",
    "status_period",
    "display_period",
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate monitor.toml at compile time
///
/// The firmware parses the same file with its own no_std subset parser at
/// boot; catching mistakes here keeps a bad file from silently falling
/// back to defaults on the device.
fn validate_config() {
    println!("cargo:rerun-if-changed=monitor.toml");

    let config_path = Path::new("monitor.toml");

    if !config_path.exists() {
        fail("monitor.toml not found", &["The firmware embeds monitor.toml from the vigil-firmware directory."]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read monitor.toml", &[&e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let msg = e.to_string();
            let lines: Vec<&str> = msg.lines().collect();
            fail("Invalid TOML syntax in monitor.toml", &lines)
        }
    };

    let mut errors = Vec::new();
    validate_timing(&config, &mut errors);
    validate_battery(&config, &mut errors);
    validate_ekg(&config, &mut errors);
    validate_calibration(&config, &mut errors);

    if !errors.is_empty() {
        let lines: Vec<&str> = errors.iter().map(String::as_str).collect();
        fail("Invalid monitor configuration", &lines);
    }

    println!("cargo:warning=monitor.toml validated successfully");
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    let timing = match config.get("timing") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[timing] must be a table".into());
            return;
        }
        None => {
            errors.push("Missing [timing] section".into());
            return;
        }
    };

    for key in PERIOD_KEYS {
        match timing.get(key) {
            Some(toml::Value::Integer(v)) if *v <= 0 || *v > u16::MAX as i64 => {
                errors.push(format!("[timing] {} must be 1-65535", key));
            }
            Some(toml::Value::Integer(_)) | None => {}
            Some(_) => errors.push(format!("[timing] {} must be an integer", key)),
        }
    }
}

fn validate_battery(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(battery) = config.get("battery").and_then(|b| b.as_table()) else {
        return;
    };
    let initial = battery.get("initial").and_then(|v| v.as_integer()).unwrap_or(200);
    let floor = battery.get("floor").and_then(|v| v.as_integer()).unwrap_or(0);
    if !(0..=u16::MAX as i64).contains(&initial) {
        errors.push("[battery] initial must be 0-65535".into());
    }
    if floor > initial {
        errors.push("[battery] floor must not exceed initial".into());
    }
}

fn validate_ekg(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(ekg) = config.get("ekg").and_then(|e| e.as_table()) else {
        return;
    };
    if let Some(shift) = ekg.get("sample_shift").and_then(|v| v.as_integer()) {
        if !(0..=15).contains(&shift) {
            errors.push("[ekg] sample_shift must be 0-15".into());
        }
    }
    if let Some(rate) = ekg.get("sample_rate_hz").and_then(|v| v.as_integer()) {
        if rate <= 0 {
            errors.push("[ekg] sample_rate_hz must be positive".into());
        }
    }
}

fn validate_calibration(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(calibration) = config.get("calibration").and_then(|c| c.as_table()) else {
        return;
    };

    for (name, entry) in calibration {
        if !CALIBRATED_SIGNALS.contains(&name.as_str()) {
            errors.push(format!("[calibration.{}] is not a calibrated signal", name));
            continue;
        }
        let Some(entry) = entry.as_table() else {
            errors.push(format!("[calibration.{}] must be a table", name));
            continue;
        };
        if let Some(den) = entry.get("den").and_then(|v| v.as_integer()) {
            if den <= 0 {
                errors.push(format!("[calibration.{}] den must be positive", name));
            }
        }
    }
}

/// Abort the build with a boxed error report
fn fail(title: &str, lines: &[&str]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
