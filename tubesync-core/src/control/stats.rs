//! Link and frame-rate statistics

use portable_atomic::{AtomicU32, Ordering};

/// Process-wide link statistics, readable from either core
#[derive(Debug, Default)]
pub struct LinkStats {
    rx_errors: AtomicU32,
    tx_errors: AtomicU32,
    frame_rate: AtomicU32,
}

impl LinkStats {
    /// Create zeroed statistics
    pub const fn new() -> Self {
        Self {
            rx_errors: AtomicU32::new(0),
            tx_errors: AtomicU32::new(0),
            frame_rate: AtomicU32::new(0),
        }
    }

    /// Rejected receive words and frames since boot
    pub fn rx_errors(&self) -> u32 {
        self.rx_errors.load(Ordering::Relaxed)
    }

    /// Failed transmissions since boot
    pub fn tx_errors(&self) -> u32 {
        self.tx_errors.load(Ordering::Relaxed)
    }

    /// Frames drawn during the last complete calendar second
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.load(Ordering::Relaxed)
    }

    pub(crate) fn count_rx_error(&self) {
        self.rx_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_tx_error(&self) {
        self.tx_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn publish_frame_rate(&self, rate: u32) {
        self.frame_rate.store(rate, Ordering::Relaxed);
    }
}

/// Counts frames per calendar second
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    current_second: Option<u8>,
    count: u32,
}

impl FrameCounter {
    /// Create an empty counter
    pub const fn new() -> Self {
        Self {
            current_second: None,
            count: 0,
        }
    }

    /// Count one frame drawn during `second`
    ///
    /// When the second changes, the finished window's count is published.
    pub fn count(&mut self, second: u8, stats: &LinkStats) {
        if self.current_second == Some(second) {
            self.count += 1;
            return;
        }
        if self.current_second.is_some() {
            stats.publish_frame_rate(self.count);
        }
        self.current_second = Some(second);
        self.count = 1;
    }

    /// Frames counted so far in the current window
    pub fn in_progress(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_published_on_second_change() {
        let stats = LinkStats::new();
        let mut counter = FrameCounter::new();

        for _ in 0..40 {
            counter.count(10, &stats);
        }
        assert_eq!(stats.frame_rate(), 0);
        assert_eq!(counter.in_progress(), 40);

        counter.count(11, &stats);
        assert_eq!(stats.frame_rate(), 40);
        assert_eq!(counter.in_progress(), 1);

        for _ in 0..9 {
            counter.count(11, &stats);
        }
        counter.count(12, &stats);
        assert_eq!(stats.frame_rate(), 10);
    }

    #[test]
    fn test_error_counters() {
        let stats = LinkStats::new();
        stats.count_rx_error();
        stats.count_rx_error();
        stats.count_tx_error();
        assert_eq!(stats.rx_errors(), 2);
        assert_eq!(stats.tx_errors(), 1);
    }
}
