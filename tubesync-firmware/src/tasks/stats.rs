//! Once-per-second link and frame-rate report
//!
//! Reads the statistics the control loop publishes from core 1 and logs
//! them. Also reports when the loop stops.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};

use tubesync_core::control::{ControlError, LinkStats, LoopControl};

/// Report interval in milliseconds
pub const STATS_INTERVAL_MS: u64 = 1000;

/// How the core 1 loop ended
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopExit {
    /// Cancelled and cleaned up
    Stopped,
    /// Failed to start
    Failed(ControlError),
}

/// Raised by core 1 when its loop returns
pub static LOOP_EXIT: Signal<CriticalSectionRawMutex, LoopExit> = Signal::new();

/// Stats task - logs frame rate and link errors every second
#[embassy_executor::task]
pub async fn stats_task(control: &'static LoopControl, stats: &'static LinkStats) {
    info!("Stats task started");

    let mut ticker = Ticker::every(Duration::from_millis(STATS_INTERVAL_MS));
    let mut last_rx_errors = stats.rx_errors();

    loop {
        ticker.next().await;

        if let Some(exit) = LOOP_EXIT.try_take() {
            match exit {
                LoopExit::Stopped => info!("Control loop stopped"),
                LoopExit::Failed(e) => error!("Control loop failed: {:?}", e),
            }
        }

        let rx_errors = stats.rx_errors();
        let rx_delta = rx_errors.wrapping_sub(last_rx_errors);
        last_rx_errors = rx_errors;

        if rx_delta > 0 {
            warn!(
                "{} fps, {} rx errors (+{}), {} tx errors, running={}",
                stats.frame_rate(),
                rx_errors,
                rx_delta,
                stats.tx_errors(),
                control.is_running()
            );
        } else {
            debug!(
                "{} fps, {} rx errors, {} tx errors, running={}",
                stats.frame_rate(),
                rx_errors,
                stats.tx_errors(),
                control.is_running()
            );
        }
    }
}
