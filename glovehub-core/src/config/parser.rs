//! Minimal TOML parser for the hub roster
//!
//! Handles only the subset `roster.toml` uses, without allocating:
//! - `[hub]` and `[sensor.<name>]` section headers
//! - `key = value` pairs with quoted strings and integers (decimal or `0x`
//!   hex)
//! - `#` comments, whole-line or trailing
//!
//! Sensors keep the order they appear in; that is the polling order.

use heapless::String;

use super::types::{
    AcquisitionMode, ConfigError, HubConfig, ReplyKind, SensorConfig, DEFAULT_BROADCAST_ADDRESS,
    DEFAULT_BROADCAST_COMMAND, MAX_NAME_LEN,
};

/// Current parsing context
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    Root,
    Hub,
    Sensor,
}

/// Sensor being assembled from its section
#[derive(Default)]
struct PendingSensor {
    name: String<MAX_NAME_LEN>,
    address: Option<u8>,
    taxels: Option<u8>,
}

impl PendingSensor {
    fn finish(self) -> Result<SensorConfig, ConfigError> {
        Ok(SensorConfig {
            name: self.name,
            address: self.address.ok_or(ConfigError::MissingKey)?,
            taxels: self.taxels.ok_or(ConfigError::MissingKey)?,
        })
    }
}

/// Broadcast settings may appear in any order relative to `acquisition`
struct PendingAcquisition {
    broadcast: bool,
    address: u8,
    command: u8,
}

/// Parse roster TOML into a validated [`HubConfig`]
pub fn parse_hub_config(input: &str) -> Result<HubConfig, ConfigError> {
    let mut config = HubConfig::default();
    let mut section = Section::Root;
    let mut current: Option<PendingSensor> = None;
    let mut acquisition = PendingAcquisition {
        broadcast: false,
        address: DEFAULT_BROADCAST_ADDRESS,
        command: DEFAULT_BROADCAST_COMMAND,
    };

    for line in input.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            save_sensor(&mut config, current.take())?;
            section = parse_section_header(&line[1..line.len() - 1], &mut current)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::InvalidValue)?;
        match section {
            Section::Root => return Err(ConfigError::UnknownKey),
            Section::Hub => apply_hub_value(key, value, &mut config, &mut acquisition)?,
            Section::Sensor => {
                let sensor = current.as_mut().ok_or(ConfigError::InvalidSection)?;
                apply_sensor_value(key, value, sensor)?;
            }
        }
    }
    save_sensor(&mut config, current.take())?;

    if acquisition.broadcast {
        config.acquisition = AcquisitionMode::Broadcast {
            address: acquisition.address,
            command: acquisition.command,
        };
    }

    config.validate()?;
    Ok(config)
}

fn save_sensor(config: &mut HubConfig, sensor: Option<PendingSensor>) -> Result<(), ConfigError> {
    if let Some(sensor) = sensor {
        config
            .sensors
            .push(sensor.finish()?)
            .map_err(|_| ConfigError::TooManyDevices)?;
    }
    Ok(())
}

/// Parse a header like "hub" or "sensor.thumb_tip"
fn parse_section_header(
    header: &str,
    current: &mut Option<PendingSensor>,
) -> Result<Section, ConfigError> {
    let header = header.trim();
    if header == "hub" {
        return Ok(Section::Hub);
    }

    let name = header
        .strip_prefix("sensor.")
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.contains('.'))
        .ok_or(ConfigError::InvalidSection)?;

    *current = Some(PendingSensor {
        name: String::try_from(name).map_err(|_| ConfigError::InvalidSection)?,
        ..Default::default()
    });
    Ok(Section::Sensor)
}

fn apply_hub_value(
    key: &str,
    value: &str,
    config: &mut HubConfig,
    acquisition: &mut PendingAcquisition,
) -> Result<(), ConfigError> {
    match key {
        "sweep_delay_ms" => config.sweep_delay_ms = parse_int(value)?,
        "comm_interrupt_hz" => config.comm_interrupt_hz = parse_int(value)?,
        "acquisition" => {
            acquisition.broadcast = match parse_string(value)? {
                "free_running" => false,
                "broadcast" => true,
                _ => return Err(ConfigError::InvalidValue),
            }
        }
        "broadcast_address" => acquisition.address = parse_int(value)?,
        "broadcast_command" => acquisition.command = parse_int(value)?,
        "reply" => {
            config.reply = match parse_string(value)? {
                "timestamped" => ReplyKind::Timestamped,
                "state_word" => ReplyKind::StateWord,
                _ => return Err(ConfigError::InvalidValue),
            }
        }
        _ => return Err(ConfigError::UnknownKey),
    }
    Ok(())
}

fn apply_sensor_value(
    key: &str,
    value: &str,
    sensor: &mut PendingSensor,
) -> Result<(), ConfigError> {
    match key {
        "address" => sensor.address = Some(parse_int(value)?),
        "taxels" => sensor.taxels = Some(parse_int(value)?),
        _ => return Err(ConfigError::UnknownKey),
    }
    Ok(())
}

/// Drop a trailing comment unless the `#` sits inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a quoted string value
fn parse_string(value: &str) -> Result<&str, ConfigError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ConfigError::InvalidValue)
}

/// Parse a decimal or `0x` hex integer
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ConfigError> {
    let raw = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    }
    .map_err(|_| ConfigError::InvalidValue)?;

    T::try_from(raw).map_err(|_| ConfigError::InvalidValue)
}
