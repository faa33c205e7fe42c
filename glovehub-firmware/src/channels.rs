//! Shared state between the comm tick and the sweep loop
//!
//! The comm context is the only state both priority levels touch; its
//! buffers are guarded by a critical-section mutex.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use glovehub_core::comm::{Comm, TransportStats, DEFAULT_RX_CAPACITY, DEFAULT_TX_CAPACITY};

/// Host link buffers
pub type HubComm = Comm<CriticalSectionRawMutex, DEFAULT_RX_CAPACITY, DEFAULT_TX_CAPACITY>;

/// Host link buffers, serviced by the comm tick and filled by the sweep loop
pub static COMM: HubComm = Comm::new(CriticalSectionRawMutex::new());

/// Latest transport statistics, published by the comm tick
pub static LINK_STATS: Signal<CriticalSectionRawMutex, TransportStats> = Signal::new();
