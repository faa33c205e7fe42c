//! Sensor node reply builder
//!
//! Keeps a node's reply buffer in the layout the hub polls for. The ready
//! marker is cleared before the buffer is touched and written last, so a
//! bus read that lands mid-update is classified as not ready.

use glovehub_hal::CapSense;
use glovehub_protocol::{ReplyFormat, BYTES_PER_TAXEL, TIMESTAMP_LEN};

use crate::config::ConfigError;

/// Command byte that starts a scan on broadcast-triggered nodes
pub const SCAN_COMMAND: u8 = 0x01;

/// What starts a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// A new scan starts as soon as the previous one is published
    Continuous,
    /// Scans start on [`SCAN_COMMAND`]
    Broadcast,
}

/// Node-side reply buffer of up to `N` bytes
pub struct NodeResponder<S: CapSense, const N: usize> {
    sense: S,
    format: ReplyFormat,
    trigger: Trigger,
    reply: [u8; N],
    reply_len: usize,
    scanning: bool,
}

impl<S: CapSense, const N: usize> NodeResponder<S, N> {
    /// Wrap `sense`; continuous nodes start their first scan right away
    pub fn new(sense: S, format: ReplyFormat, trigger: Trigger) -> Result<Self, ConfigError> {
        let width = sense.taxel_count() * BYTES_PER_TAXEL;
        let reply_len = format.reply_len(width);
        if width > format.max_width() || reply_len > N {
            return Err(ConfigError::PayloadTooWide);
        }
        if format.header_len < format.marker.len() {
            return Err(ConfigError::InvalidValue);
        }

        let mut node = Self {
            sense,
            format,
            trigger,
            reply: [0; N],
            reply_len,
            scanning: false,
        };
        if trigger == Trigger::Continuous {
            node.start_scan();
        }
        Ok(node)
    }

    /// Handle bytes the hub wrote to this node
    pub fn on_command(&mut self, command: &[u8]) {
        if command != [SCAN_COMMAND] {
            return;
        }
        self.clear_marker();
        if !self.scanning {
            self.start_scan();
        }
    }

    /// Publish the last scan once the middleware is done with it
    ///
    /// `now` is the node clock, written into timestamped replies. Returns
    /// whether the reply was refreshed.
    pub fn poll(&mut self, now: u32) -> bool {
        if !self.scanning || self.sense.is_busy() {
            return false;
        }
        self.sense.process_results();
        self.scanning = false;

        self.clear_marker();
        let mut pos = self.format.header_len;
        if self.format.timestamp_len == TIMESTAMP_LEN {
            self.reply[pos..pos + TIMESTAMP_LEN].copy_from_slice(&now.to_le_bytes());
            pos += self.format.timestamp_len;
        }
        for taxel in 0..self.sense.taxel_count() {
            let raw = self.sense.raw(taxel).to_le_bytes();
            self.reply[pos..pos + BYTES_PER_TAXEL].copy_from_slice(&raw);
            pos += BYTES_PER_TAXEL;
        }
        self.format.marker.write(&mut self.reply);

        if self.trigger == Trigger::Continuous {
            self.start_scan();
        }
        true
    }

    /// The bytes a bus read returns
    pub fn reply(&self) -> &[u8] {
        &self.reply[..self.reply_len]
    }

    pub fn is_ready(&self) -> bool {
        self.format.is_ready(self.reply())
    }

    pub fn sense(&self) -> &S {
        &self.sense
    }

    fn start_scan(&mut self) {
        self.sense.start_scan();
        self.scanning = true;
    }

    fn clear_marker(&mut self) {
        self.reply[..self.format.marker.len()].fill(0);
    }
}
