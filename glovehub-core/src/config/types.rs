//! Configuration type definitions
//!
//! These types describe the hub: sweep timing, how acquisitions are
//! triggered, the reply layout its sensor nodes use and the sensor roster.
//! The firmware embeds `roster.toml` and parses it into [`HubConfig`] at
//! start-up.

use heapless::{String, Vec};

use glovehub_protocol::{ReplyFormat, BYTES_PER_TAXEL};

use crate::comm::DEFAULT_COMM_INTERRUPT_HZ;

/// Maximum sensor name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum sensors on one hub
pub const MAX_DEVICES: usize = 32;

/// Default pause between sweeps
pub const DEFAULT_SWEEP_DELAY_MS: u32 = 10;

/// General call address
pub const DEFAULT_BROADCAST_ADDRESS: u8 = 0x00;

/// Command byte asking every node to start a scan
pub const DEFAULT_BROADCAST_COMMAND: u8 = 0x01;

/// Highest 7-bit bus address
pub const MAX_BUS_ADDRESS: u8 = 0x7F;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Malformed or unknown section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Key not valid in its section
    UnknownKey,
    /// Required key absent from a sensor section
    MissingKey,
    /// More than [`MAX_DEVICES`] sensors
    TooManyDevices,
    /// Two sensors share a bus address
    DuplicateAddress,
    /// A sensor's reading would not fit in one frame
    PayloadTooWide,
    /// No sensors configured
    EmptyRoster,
}

/// How a sweep gets the nodes to acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionMode {
    /// Nodes scan continuously; the hub only polls
    #[default]
    FreeRunning,
    /// The hub writes `command` to `address` before polling
    Broadcast { address: u8, command: u8 },
}

impl AcquisitionMode {
    /// Broadcast mode with the general call address and scan command
    pub const fn broadcast() -> Self {
        AcquisitionMode::Broadcast {
            address: DEFAULT_BROADCAST_ADDRESS,
            command: DEFAULT_BROADCAST_COMMAND,
        }
    }
}

/// Reply layout preset used by every node on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyKind {
    /// Ready byte, padding, 4-byte node timestamp
    #[default]
    Timestamped,
    /// 0xFFFE state word, no timestamp
    StateWord,
}

impl ReplyKind {
    pub const fn format(&self) -> ReplyFormat {
        match self {
            ReplyKind::Timestamped => ReplyFormat::TIMESTAMPED,
            ReplyKind::StateWord => ReplyFormat::STATE_WORD,
        }
    }
}

/// One sensor node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    /// Name from the section header, for logs
    pub name: String<MAX_NAME_LEN>,
    /// 7-bit bus address
    pub address: u8,
    /// Taxels the node reports
    pub taxels: u8,
}

impl SensorConfig {
    /// Payload width in bytes
    pub fn width(&self) -> usize {
        self.taxels as usize * BYTES_PER_TAXEL
    }
}

/// Complete hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HubConfig {
    /// Pause after each sweep
    pub sweep_delay_ms: u32,
    /// Comm tick frequency
    pub comm_interrupt_hz: u32,
    pub acquisition: AcquisitionMode,
    pub reply: ReplyKind,
    /// Sensors in polling order
    pub sensors: Vec<SensorConfig, MAX_DEVICES>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            sweep_delay_ms: DEFAULT_SWEEP_DELAY_MS,
            comm_interrupt_hz: DEFAULT_COMM_INTERRUPT_HZ,
            acquisition: AcquisitionMode::FreeRunning,
            reply: ReplyKind::Timestamped,
            sensors: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Check the roster against the limits of the bus and the frame format
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        if self.comm_interrupt_hz == 0 {
            return Err(ConfigError::InvalidValue);
        }

        let max_width = self.reply.format().max_width();
        for (i, sensor) in self.sensors.iter().enumerate() {
            if sensor.address > MAX_BUS_ADDRESS || sensor.taxels == 0 {
                return Err(ConfigError::InvalidValue);
            }
            if let AcquisitionMode::Broadcast { address, .. } = self.acquisition {
                if sensor.address == address {
                    return Err(ConfigError::DuplicateAddress);
                }
            }
            if sensor.width() > max_width {
                return Err(ConfigError::PayloadTooWide);
            }
            if self.sensors[..i].iter().any(|s| s.address == sensor.address) {
                return Err(ConfigError::DuplicateAddress);
            }
        }

        Ok(())
    }

    /// Total taxels across the roster
    pub fn total_taxels(&self) -> usize {
        self.sensors.iter().map(|s| s.taxels as usize).sum()
    }
}
