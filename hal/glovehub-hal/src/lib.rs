//! glovehub Hardware Abstraction Layer
//!
//! This crate defines the hardware-facing traits the hub core is written
//! against, so the same acquisition and transport logic can run on the
//! RP2040 hub board or against mocks on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  glovehub-firmware (embassy, RP2040)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  glovehub-core (ring buffers, poller)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  glovehub-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!         │                       │
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-hal  │       │  embedded-io  │
//! │   I2C master  │       │ serial device │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - Blocking bus master used to poll sensor nodes
//! - [`link::SerialLink`] - Byte link to the host, serviced from the comm tick
//! - [`capsense::CapSense`] - Vendor capacitive-sensing middleware on leaf nodes

#![no_std]
#![deny(unsafe_code)]

pub mod capsense;
pub mod i2c;
pub mod link;

// Re-export key traits at crate root for convenience
pub use capsense::CapSense;
pub use i2c::{EmbeddedHalBus, I2cBus, I2cConfig};
pub use link::{IoLink, LinkKind, SerialLink, TxBudget};
