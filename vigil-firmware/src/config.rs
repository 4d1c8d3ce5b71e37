//! Boot configuration
//!
//! monitor.toml is embedded at compile time (and validated by build.rs),
//! then parsed on the device with the core's no_std subset parser.

use defmt::*;

use vigil_core::config::{parse_config, MonitorConfig};

/// Embedded configuration
/// Edit monitor.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../monitor.toml");

/// Parse the embedded configuration, falling back to compiled defaults
pub fn load_config() -> MonitorConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using compiled defaults");
            MonitorConfig::new()
        }
    }
}

/// Scheduler tick length in milliseconds
pub fn tick_interval_ms(config: &MonitorConfig) -> u64 {
    1000 / u64::from(config.timing.ticks_per_second.max(1))
}
