//! Sweep loop
//!
//! Runs one roster sweep after another, pausing `sweep_delay_ms` in
//! between. Readings are framed straight into the comm context.

use defmt::*;
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::Timer;

use glovehub_core::comm::TransportStats;
use glovehub_core::roster::{Poller, SweepOutcome};
use glovehub_hal::EmbeddedHalBus;

use crate::channels::{COMM, LINK_STATS};

/// Sensor bus type on the hub board
pub type SensorBus = EmbeddedHalBus<I2c<'static, I2C0, Blocking>>;

#[embassy_executor::task]
pub async fn sweep_task(mut poller: Poller, mut bus: SensorBus, sweep_delay_ms: u32) {
    info!(
        "Sweep task started: {} sensors, {:?}",
        poller.roster().len(),
        poller.reply_format()
    );

    let mut sink = &COMM;
    let mut sweeps: u32 = 0;
    let mut last_stats = TransportStats::default();

    loop {
        let report = poller.run_sweep(&mut bus, &mut sink);
        sweeps = sweeps.wrapping_add(1);

        match report.outcome {
            SweepOutcome::Abandoned => warn!("Sweep {}: broadcast failed, sweep abandoned", sweeps),
            SweepOutcome::Completed => {
                if report.gave_up > 0 {
                    warn!(
                        "Sweep {}: gave up on {} sensors after retries",
                        sweeps, report.gave_up
                    );
                }
                if report.frames_dropped > 0 {
                    warn!("Sweep {}: {} readings dropped", sweeps, report.frames_dropped);
                }
                debug!(
                    "Sweep {}: {} frames, {} reads in {} passes",
                    sweeps, report.frames, report.attempts, report.passes
                );
            }
        }
        trace!("Sweep report: {:?}", report);

        if let Some(stats) = LINK_STATS.try_take() {
            log_link_stats(&last_stats, &stats);
            last_stats = stats;
        }

        Timer::after_millis(sweep_delay_ms as u64).await;
    }
}

fn log_link_stats(last: &TransportStats, stats: &TransportStats) {
    info!(
        "Link: tx {} B in {} packets, rx {} B",
        stats.tx_bytes, stats.tx_packets, stats.rx_bytes
    );
    if stats.rx_dropped_bytes != last.rx_dropped_bytes {
        warn!("Link: {} RX bytes dropped so far", stats.rx_dropped_bytes);
    }
    if stats.tx_backlog_drops != last.tx_backlog_drops {
        warn!(
            "Link: TX backlog discarded {} times ({} rejects)",
            stats.tx_backlog_drops, stats.tx_rejects
        );
    }
}
