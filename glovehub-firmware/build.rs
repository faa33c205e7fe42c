//! Build script for glovehub-firmware
//!
//! - Sets up linker search paths and scripts for memory.x
//! - Validates roster.toml at compile time

use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Must match the firmware's roster capacity
const MAX_DEVICES: usize = 32;

/// Widest taxel count whose reading fits one frame with a timestamp
const MAX_TAXELS_TIMESTAMPED: i64 = 123;

/// Widest taxel count whose reading fits one frame without a timestamp
const MAX_TAXELS_STATE_WORD: i64 = 125;

fn main() {
    setup_linker();
    validate_roster();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate roster.toml at compile time
fn validate_roster() {
    println!("cargo:rerun-if-changed=roster.toml");

    let roster_path = Path::new("roster.toml");

    if !roster_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: roster.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a roster.toml listing the sensor nodes.   ║\n\
            ║  Please create one in the glovehub-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(roster_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read roster.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let roster: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in roster.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    let state_word = validate_hub(&roster, &mut errors);
    let count = validate_sensors(&roster, state_word, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid roster configuration                             ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=roster.toml validated: {} sensors", count);
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check the [hub] table; returns whether nodes use the state-word reply
fn validate_hub(roster: &toml::Value, errors: &mut Vec<String>) -> bool {
    let hub = match roster.get("hub") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[hub] must be a table".to_string());
            return false;
        }
        None => return false,
    };

    for (key, value) in hub {
        match (key.as_str(), value) {
            ("sweep_delay_ms", toml::Value::Integer(v)) if *v >= 0 => {}
            ("comm_interrupt_hz", toml::Value::Integer(v)) if *v > 0 => {}
            ("broadcast_address" | "broadcast_command", toml::Value::Integer(v))
                if (0..=0xFF).contains(v) => {}
            ("acquisition", toml::Value::String(s))
                if s == "free_running" || s == "broadcast" => {}
            ("reply", toml::Value::String(s)) if s == "timestamped" || s == "state_word" => {}
            (
                "sweep_delay_ms" | "comm_interrupt_hz" | "broadcast_address"
                | "broadcast_command" | "acquisition" | "reply",
                _,
            ) => errors.push(format!("[hub] invalid value for '{}'", key)),
            _ => errors.push(format!("[hub] unknown key '{}'", key)),
        }
    }

    matches!(hub.get("reply"), Some(toml::Value::String(s)) if s == "state_word")
}

/// Check every [sensor.*] table; returns the sensor count
fn validate_sensors(roster: &toml::Value, state_word: bool, errors: &mut Vec<String>) -> usize {
    let sensors = match roster.get("sensor") {
        Some(toml::Value::Table(t)) => t,
        _ => {
            errors.push("Missing [sensor.*] section - at least one sensor is required".to_string());
            return 0;
        }
    };

    if sensors.len() > MAX_DEVICES {
        errors.push(format!("at most {} sensors are supported", MAX_DEVICES));
    }

    let max_taxels = if state_word {
        MAX_TAXELS_STATE_WORD
    } else {
        MAX_TAXELS_TIMESTAMPED
    };
    let mut addresses: BTreeMap<i64, &str> = BTreeMap::new();

    for (name, sensor) in sensors {
        if name.len() > 16 {
            errors.push(format!("[sensor.{}] name longer than 16 characters", name));
        }
        let sensor = match sensor {
            toml::Value::Table(t) => t,
            _ => {
                errors.push(format!("[sensor.{}] must be a table", name));
                continue;
            }
        };

        match sensor.get("address") {
            Some(toml::Value::Integer(address)) if (0x01..=0x7F).contains(address) => {
                if let Some(other) = addresses.insert(*address, name.as_str()) {
                    errors.push(format!(
                        "[sensor.{}] address 0x{:02X} already used by '{}'",
                        name, address, other
                    ));
                }
            }
            Some(_) => errors.push(format!("[sensor.{}] address must be 0x01-0x7F", name)),
            None => errors.push(format!("[sensor.{}] missing 'address'", name)),
        }

        match sensor.get("taxels") {
            Some(toml::Value::Integer(taxels)) if (1..=max_taxels).contains(taxels) => {}
            Some(_) => errors.push(format!("[sensor.{}] taxels must be 1-{}", name, max_taxels)),
            None => errors.push(format!("[sensor.{}] missing 'taxels'", name)),
        }

        for key in sensor.keys() {
            if key != "address" && key != "taxels" {
                errors.push(format!("[sensor.{}] unknown key '{}'", name, key));
            }
        }
    }

    sensors.len()
}
