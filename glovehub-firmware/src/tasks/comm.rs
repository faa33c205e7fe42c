//! Comm tick
//!
//! Services the host link at a fixed rate. Each tick is one critical
//! section over both ring buffers.

use defmt::*;
use embassy_time::{Duration, Ticker};

use glovehub_core::comm::Transport;
use glovehub_hal::IoLink;

use crate::channels::{COMM, LINK_STATS};
use crate::link::HostUart;

/// Ticks between statistics updates (about once per second at 2 kHz)
const STATS_EVERY_TICKS: u32 = 2000;

#[embassy_executor::task]
pub async fn comm_task(mut transport: Transport<IoLink<HostUart>>, rate_hz: u32) {
    info!("Comm task started");

    let mut ticker = Ticker::every(Duration::from_hz(rate_hz as u64));
    let mut ticks: u32 = 0;

    loop {
        ticker.next().await;
        COMM.service(&mut transport);

        ticks = ticks.wrapping_add(1);
        if ticks % STATS_EVERY_TICKS == 0 {
            LINK_STATS.signal(transport.stats());
        }
    }
}
