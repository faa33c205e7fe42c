//! Sensor Hub Wire Protocol
//!
//! This crate defines the two byte layouts the hub deals with:
//!
//! - the frame format streamed from the hub to the host over the serial
//!   link, one frame per sensor reading
//! - the reply buffer a sensor node exposes on the I2C bus
//!
//! # Frame Overview
//!
//! ```text
//! ┌───────┬────────┬──────────────┬─────┐
//! │ START │ LENGTH │ PAYLOAD      │ END │
//! │ 0x01  │ 1B     │ 0-252B       │ \n  │
//! └───────┴────────┴──────────────┴─────┘
//! ```
//!
//! LENGTH counts the whole frame, markers included. A reading payload is
//! the sensor address, an optional little-endian timestamp, then the raw
//! taxel bytes.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod frame;
pub mod reading;

pub use frame::{
    Frame, FrameError, FOOTER_LEN, FRAME_END, FRAME_OVERHEAD, FRAME_START, HEADER_LEN,
    LENGTH_OFFSET, LINE_TERMINATOR, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use reading::{ReadyMarker, Reading, ReplyFormat, BYTES_PER_TAXEL, TIMESTAMP_LEN};
