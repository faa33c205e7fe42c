//! Board-agnostic core logic for the sensor hub firmware
//!
//! This crate contains all hub logic that does not depend on a specific
//! board:
//!
//! - Fixed-capacity ring buffers for the host link
//! - Timer-driven transport service (RX batches, TX packets, backpressure)
//! - Message framer with a resynchronizing decoder
//! - Sensor roster and the bounded-retry sweep state machine
//! - Roster configuration types and parser
//! - Reply buffer builder for leaf sensor nodes

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod comm;
pub mod config;
pub mod node;
pub mod ring_buffer;
pub mod roster;

pub use comm::{Comm, ReadingSink, Transport, TransportStats};
pub use config::HubConfig;
pub use ring_buffer::{RingBuffer, RingError};
pub use roster::{DeviceInfo, Poller, Roster, SweepReport, SweepState};
