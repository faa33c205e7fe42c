//! Sweep state machine
//!
//! One sweep tries to read every roster device once:
//!
//! ```text
//! Idle ──> Broadcasting ──> Polling ──> Draining ──> SweepDone ──> Idle
//!   │     (broadcast mode)     │           ↺ until                ↑
//!   └──────────────────────────┘           all done               │
//!        (free-running mode)     broadcast failed: back to Idle ──┘
//! ```
//!
//! A device that keeps failing is given up on for the sweep after
//! [`MAX_READ_ATTEMPTS`]. Devices are never taken offline by the poller.

use glovehub_hal::I2cBus;
use glovehub_protocol::{ReplyFormat, MAX_PAYLOAD_SIZE, TIMESTAMP_LEN};

use super::device::Roster;
use crate::comm::ReadingSink;
use crate::config::{AcquisitionMode, ConfigError, HubConfig};

/// Attempts per device per sweep
pub const MAX_READ_ATTEMPTS: u8 = 5;

/// Largest bus reply the poller can hold (4-byte header, timestamp, payload)
pub const MAX_REPLY_LEN: usize = 4 + TIMESTAMP_LEN + MAX_PAYLOAD_SIZE;

/// Sweep states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SweepState {
    Idle,
    /// Sending the scan command to every node
    Broadcasting,
    /// First pass over the roster
    Polling,
    /// Further passes over devices not read yet
    Draining,
    /// Every device finished; flags about to be cleared
    SweepDone,
}

/// Classification of one device read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// Full reply with the ready marker in place
    Complete,
    /// Transfer finished but the reply is short or not ready
    NotReady,
    /// Bus fault
    TransferError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SweepOutcome {
    #[default]
    Completed,
    /// Broadcast write failed; nothing was polled
    Abandoned,
}

/// What happened during one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepReport {
    pub outcome: SweepOutcome,
    /// Readings handed to the sink
    pub frames: u8,
    /// Readings the sink refused
    pub frames_dropped: u8,
    /// Devices given up on after [`MAX_READ_ATTEMPTS`]
    pub gave_up: u8,
    /// Bus reads issued
    pub attempts: u16,
    /// Passes over the roster
    pub passes: u8,
}

/// Roster poller
pub struct Poller {
    roster: Roster,
    acquisition: AcquisitionMode,
    reply: ReplyFormat,
    state: SweepState,
    report: SweepReport,
    reply_buf: [u8; MAX_REPLY_LEN],
    reading_buf: [u8; MAX_PAYLOAD_SIZE],
}

impl Poller {
    /// Create a poller for `roster`
    ///
    /// Fails with `PayloadTooWide` if a device's reading cannot fit in one
    /// frame or its reply cannot fit the reply buffer.
    pub fn new(
        roster: Roster,
        acquisition: AcquisitionMode,
        reply: ReplyFormat,
    ) -> Result<Self, ConfigError> {
        let width = roster.max_width();
        if width > reply.max_width() || reply.reply_len(width) > MAX_REPLY_LEN {
            return Err(ConfigError::PayloadTooWide);
        }
        if reply.header_len < reply.marker.len() {
            return Err(ConfigError::InvalidValue);
        }

        Ok(Self {
            roster,
            acquisition,
            reply,
            state: SweepState::Idle,
            report: SweepReport::default(),
            reply_buf: [0; MAX_REPLY_LEN],
            reading_buf: [0; MAX_PAYLOAD_SIZE],
        })
    }

    /// Create a poller from a parsed hub configuration
    pub fn from_config(config: &HubConfig) -> Result<Self, ConfigError> {
        Self::new(
            Roster::from_config(config)?,
            config.acquisition,
            config.reply.format(),
        )
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn reply_format(&self) -> ReplyFormat {
        self.reply
    }

    /// Report of the sweep in progress, or the last one when idle
    pub fn report(&self) -> SweepReport {
        self.report
    }

    /// Perform one state transition and return the new state
    pub fn step<B: I2cBus, S: ReadingSink>(&mut self, bus: &mut B, sink: &mut S) -> SweepState {
        self.state = match self.state {
            SweepState::Idle => {
                self.report = SweepReport::default();
                match self.acquisition {
                    AcquisitionMode::Broadcast { .. } => SweepState::Broadcasting,
                    AcquisitionMode::FreeRunning => SweepState::Polling,
                }
            }
            SweepState::Broadcasting => match self.broadcast(bus) {
                Ok(()) => SweepState::Polling,
                Err(_) => {
                    self.report.outcome = SweepOutcome::Abandoned;
                    SweepState::Idle
                }
            },
            SweepState::Polling | SweepState::Draining => {
                self.poll_pass(bus, sink);
                if self.roster.all_done() {
                    SweepState::SweepDone
                } else {
                    SweepState::Draining
                }
            }
            SweepState::SweepDone => {
                self.roster.reset_sweep();
                SweepState::Idle
            }
        };
        self.state
    }

    /// Run one whole sweep from `Idle` back to `Idle`
    pub fn run_sweep<B: I2cBus, S: ReadingSink>(
        &mut self,
        bus: &mut B,
        sink: &mut S,
    ) -> SweepReport {
        if self.state == SweepState::Idle {
            self.step(bus, sink);
        }
        while self.step(bus, sink) != SweepState::Idle {}
        self.report
    }

    fn broadcast<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        match self.acquisition {
            AcquisitionMode::Broadcast { address, command } => bus.write(address, &[command]),
            AcquisitionMode::FreeRunning => Ok(()),
        }
    }

    /// One pass over the roster, in order
    fn poll_pass<B: I2cBus, S: ReadingSink>(&mut self, bus: &mut B, sink: &mut S) {
        self.report.passes = self.report.passes.saturating_add(1);

        for index in 0..self.roster.len() {
            let device = self.roster.as_slice()[index];
            if !device.is_pending() {
                continue;
            }

            self.report.attempts = self.report.attempts.saturating_add(1);
            let status = self.read_device(bus, device.address, device.width());

            let device = &mut self.roster.as_mut_slice()[index];
            match status {
                TransferStatus::Complete => {
                    device.was_read = true;
                    let (address, width) = (device.address, device.width());
                    self.forward(sink, address, width);
                }
                TransferStatus::NotReady | TransferStatus::TransferError => {
                    device.retry_count += 1;
                    if device.retry_count >= MAX_READ_ATTEMPTS {
                        device.was_read = true;
                        self.report.gave_up = self.report.gave_up.saturating_add(1);
                    }
                }
            }
        }
    }

    /// Read one device's reply into the reply buffer and classify it
    pub fn read_device<B: I2cBus>(
        &mut self,
        bus: &mut B,
        address: u8,
        width: usize,
    ) -> TransferStatus {
        let len = self.reply.reply_len(width);
        let reply = &mut self.reply_buf[..len];
        reply.fill(0);

        match bus.read(address, reply) {
            Ok(n) if n == len && self.reply.is_ready(reply) => TransferStatus::Complete,
            Ok(_) => TransferStatus::NotReady,
            Err(_) => TransferStatus::TransferError,
        }
    }

    /// Encode the reading held in the reply buffer and hand it to the sink
    fn forward<S: ReadingSink>(&mut self, sink: &mut S, address: u8, width: usize) {
        let len = self.reply.reply_len(width);
        let sent = self
            .reply
            .reading(address, &self.reply_buf[..len])
            .and_then(|reading| reading.encode(&mut self.reading_buf))
            .and_then(|n| sink.submit(&self.reading_buf[..n]));

        match sent {
            Ok(()) => self.report.frames = self.report.frames.saturating_add(1),
            Err(_) => self.report.frames_dropped = self.report.frames_dropped.saturating_add(1),
        }
    }
}
