//! Roster configuration
//!
//! `roster.toml` is embedded at build time; build.rs has already checked
//! it, so a parse failure here means the firmware and the build script
//! disagree about the format.

use defmt::*;

use glovehub_core::config::{parse_hub_config, AcquisitionMode, ConfigError, HubConfig};

/// Embedded roster (compiled into firmware)
/// Edit roster.toml and rebuild to change the sensor set
const EMBEDDED_ROSTER: &str = include_str!("../roster.toml");

/// Parse the embedded roster and log what it contains
pub fn load() -> Result<HubConfig, ConfigError> {
    let config = parse_hub_config(EMBEDDED_ROSTER).inspect_err(|e| {
        error!("Failed to parse roster.toml: {:?}", e);
    })?;

    info!(
        "Roster loaded: {} sensors, {} taxels, reply {:?}",
        config.sensors.len(),
        config.total_taxels(),
        config.reply
    );
    match config.acquisition {
        AcquisitionMode::FreeRunning => info!("Acquisition: free running"),
        AcquisitionMode::Broadcast { address, command } => info!(
            "Acquisition: broadcast 0x{:02x} to 0x{:02x}",
            command, address
        ),
    }
    for sensor in &config.sensors {
        debug!(
            "  {} @ 0x{:02x}: {} taxels",
            sensor.name.as_str(),
            sensor.address,
            sensor.taxels
        );
    }

    Ok(config)
}
