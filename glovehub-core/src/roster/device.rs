//! Sensor roster

use heapless::Vec;

use glovehub_protocol::BYTES_PER_TAXEL;

use crate::config::{ConfigError, HubConfig, MAX_DEVICES};

/// Per-device polling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    /// 7-bit bus address
    pub address: u8,
    /// Expected payload bytes per reading
    pub payload_width: u16,
    pub is_online: bool,
    /// Finished for this sweep (read, or given up on)
    pub was_read: bool,
    /// Failed attempts this sweep
    pub retry_count: u8,
}

impl DeviceInfo {
    pub const fn new(address: u8, payload_width: u16) -> Self {
        Self {
            address,
            payload_width,
            is_online: true,
            was_read: false,
            retry_count: 0,
        }
    }

    /// Device reporting `taxels` raw values
    pub const fn with_taxels(address: u8, taxels: u8) -> Self {
        Self::new(address, taxels as u16 * BYTES_PER_TAXEL as u16)
    }

    /// Whether this sweep still has to poll the device
    pub fn is_pending(&self) -> bool {
        self.is_online && !self.was_read
    }

    pub fn width(&self) -> usize {
        self.payload_width as usize
    }

    fn reset_sweep(&mut self) {
        self.was_read = false;
        self.retry_count = 0;
    }
}

/// Ordered, fixed-capacity device list
///
/// Filled once at start-up; sweeps only touch the per-device flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    devices: Vec<DeviceInfo, MAX_DEVICES>,
}

impl Roster {
    pub const fn new() -> Self {
        Self { devices: Vec::new() }
    }

    /// Build the roster from the configured sensors, in file order
    pub fn from_config(config: &HubConfig) -> Result<Self, ConfigError> {
        let mut roster = Self::new();
        for sensor in &config.sensors {
            roster.add(DeviceInfo::with_taxels(sensor.address, sensor.taxels))?;
        }
        Ok(roster)
    }

    /// Append a device
    pub fn add(&mut self, device: DeviceInfo) -> Result<(), ConfigError> {
        if self.get(device.address).is_some() {
            return Err(ConfigError::DuplicateAddress);
        }
        self.devices
            .push(device)
            .map_err(|_| ConfigError::TooManyDevices)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter()
    }

    pub fn as_slice(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [DeviceInfo] {
        &mut self.devices
    }

    /// Look up a device by bus address
    pub fn get(&self, address: u8) -> Option<&DeviceInfo> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// Take a device out of (or back into) the sweep
    ///
    /// Returns `false` if no device has that address.
    pub fn set_online(&mut self, address: u8, online: bool) -> bool {
        match self.devices.iter_mut().find(|d| d.address == address) {
            Some(device) => {
                device.is_online = online;
                true
            }
            None => false,
        }
    }

    /// Every device is finished for this sweep
    pub fn all_done(&self) -> bool {
        self.devices.iter().all(|d| !d.is_pending())
    }

    /// Clear per-sweep state on every device
    pub fn reset_sweep(&mut self) {
        self.devices.iter_mut().for_each(DeviceInfo::reset_sweep);
    }

    /// Widest payload on the roster
    pub fn max_width(&self) -> usize {
        self.devices.iter().map(DeviceInfo::width).max().unwrap_or(0)
    }
}
