//! Coherent time snapshots from the RTC and the microsecond counter

use tubesync_hal::{Calendar, ClockDriver};

use super::dst::{DstInfo, DstTracker, ZoneConfig};
use super::timestamp::{LocalAdjustment, LocalCalendarTime, TimeError, Timestamp};

/// Microseconds per second
pub const US_PER_S: u32 = 1_000_000;

/// Phase shift of the µs counter modulo one second after a 2^32 wrap
///
/// `1_000_000 - (2^32 % 1_000_000)`
pub const TICKS_ROLLOVER_SHIFT_US: u32 = US_PER_S - (((1u64 << 32) % US_PER_S as u64) as u32);

/// Give up waiting for a calendar edge after this many µs (stopped RTC)
const ANCHOR_TIMEOUT_US: u32 = 2 * US_PER_S;

/// Time source for the render loop
///
/// Produces one [`Timestamp`] per frame and the [`LocalAdjustment`] that
/// turns it into displayed local time.
#[derive(Debug, Clone)]
pub struct TimeSource {
    anchored: bool,
    /// Counter phase (mod 1 s) at the last calendar-second edge
    tick_offset: u32,
    prev_ticks: u32,
    timestamp: Timestamp,
    adjustment: LocalAdjustment,
    dst: DstTracker,
}

impl TimeSource {
    /// Create an unanchored time source
    pub fn new(zone: ZoneConfig) -> Self {
        Self {
            anchored: false,
            tick_offset: 0,
            prev_ticks: 0,
            timestamp: Timestamp::default(),
            adjustment: LocalAdjustment::from_minutes(zone.utc_offset_minutes),
            dst: DstTracker::new(zone),
        }
    }

    /// Whether the counter has been aligned to a calendar-second edge
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Align the µs counter to the next calendar-second edge
    ///
    /// Busy-waits until the calendar second changes and records the counter
    /// there. If the RTC does not tick within two seconds the current
    /// counter value is used instead.
    pub fn anchor<C: ClockDriver>(&mut self, clock: &mut C) {
        let initial = clock.read_calendar().second;
        let started = clock.ticks_us();

        while clock.read_calendar().second == initial {
            if clock.ticks_us().wrapping_sub(started) > ANCHOR_TIMEOUT_US {
                break;
            }
        }
        let ticks = clock.ticks_us();

        self.tick_offset = ticks % US_PER_S;
        self.prev_ticks = ticks;
        self.anchored = true;
    }

    /// Drop the current anchor and take a new one
    pub fn resync<C: ClockDriver>(&mut self, clock: &mut C) {
        self.anchored = false;
        self.anchor(clock);
    }

    /// Microseconds into the current second for a counter value
    fn sub_second_us(&mut self, ticks: u32) -> u32 {
        if ticks < self.prev_ticks {
            self.tick_offset = (self.tick_offset + TICKS_ROLLOVER_SHIFT_US) % US_PER_S;
        }
        self.prev_ticks = ticks;

        (ticks % US_PER_S + US_PER_S - self.tick_offset) % US_PER_S
    }

    /// Take a new coherent snapshot
    ///
    /// Reads calendar, counter, calendar and retries until both calendar
    /// reads agree, so the sub-second part always belongs to the reported
    /// second. Anchors first if needed.
    pub fn update<C: ClockDriver>(&mut self, clock: &mut C) -> Timestamp {
        if !self.anchored {
            self.anchor(clock);
        }

        let (calendar, micros) = loop {
            let before = clock.read_calendar();
            let ticks = clock.ticks_us();
            let after = clock.read_calendar();
            let micros = self.sub_second_us(ticks);
            if before == after {
                break (after, micros);
            }
        };

        self.timestamp = Timestamp::from_calendar(calendar, micros);
        self.timestamp
    }

    /// Refresh the local-time offset for the current snapshot
    ///
    /// The DST check runs at most once per clock-hour. An unset RTC keeps
    /// the standard offset.
    pub fn apply_local_adjustment(&mut self) -> LocalAdjustment {
        if let Ok(epoch) = self.timestamp.epoch_seconds() {
            self.dst.update(epoch);
        }
        self.adjustment = self.dst.adjustment();
        self.adjustment
    }

    /// Most recent snapshot
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Most recent local-time offset
    pub fn adjustment(&self) -> LocalAdjustment {
        self.adjustment
    }

    /// Zone rule in use
    pub fn zone(&self) -> ZoneConfig {
        self.dst.zone()
    }

    /// Replace the zone rule; the next adjustment re-evaluates DST
    pub fn set_zone(&mut self, zone: ZoneConfig) {
        self.dst = DstTracker::new(zone);
        self.adjustment = LocalAdjustment::from_minutes(zone.utc_offset_minutes);
    }

    /// Snapshot as Unix milliseconds, optionally shifted to local time
    pub fn epoch_millis(&self, local: bool) -> Result<i64, TimeError> {
        let millis = self.timestamp.to_naive()?.and_utc().timestamp_millis();
        Ok(if local {
            millis + self.adjustment.total_millis()
        } else {
            millis
        })
    }

    /// Snapshot as fractional Unix seconds, optionally shifted to local time
    pub fn epoch_seconds_float(&self, local: bool) -> Result<f64, TimeError> {
        let mut micros = self.timestamp.to_naive()?.and_utc().timestamp_micros();
        if local {
            micros += self.adjustment.total_millis() * 1000;
        }
        Ok(micros as f64 / US_PER_S as f64)
    }

    /// Snapshot converted to local calendar time
    pub fn local_calendar_time(&self) -> Result<LocalCalendarTime, TimeError> {
        let utc = self.timestamp.to_naive()?;
        self.adjustment
            .as_delta()
            .and_then(|delta| utc.checked_add_signed(delta))
            .map(LocalCalendarTime::from)
            .ok_or(TimeError::InvalidCalendar)
    }

    /// Current DST decision and window
    pub fn dst_info(&self) -> DstInfo {
        self.dst.info()
    }

    /// Calendar of the most recent snapshot, without sub-second part
    pub fn calendar(&self) -> Calendar {
        Calendar::new(
            self.timestamp.year,
            self.timestamp.month,
            self.timestamp.day,
            self.timestamp.hour,
            self.timestamp.minute,
            self.timestamp.second,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClock;

    fn eastern() -> ZoneConfig {
        ZoneConfig::default()
    }

    #[test]
    fn test_rollover_shift_constant() {
        assert_eq!(TICKS_ROLLOVER_SHIFT_US, 32_704);
    }

    #[test]
    fn test_anchor_aligns_to_second_edge() {
        // Start 0.3 s into a second, counter phase unrelated to the RTC
        let mut clock = MockClock::new(Calendar::new(2024, 6, 1, 12, 0, 0), 300_000, 123_456);
        let mut time = TimeSource::new(eastern());
        time.anchor(&mut clock);
        assert!(time.is_anchored());

        clock.advance_us(250_000);
        let ts = time.update(&mut clock);
        assert_eq!(ts.second, 1);
        assert!((250_000..260_000).contains(&ts.micros), "micros = {}", ts.micros);
    }

    #[test]
    fn test_update_anchors_lazily() {
        let mut clock = MockClock::new(Calendar::new(2024, 6, 1, 12, 0, 0), 900_000, 0);
        let mut time = TimeSource::new(eastern());
        let ts = time.update(&mut clock);
        assert!(time.is_anchored());
        assert_eq!(ts.second, 1);
        assert!(ts.micros < 10_000);
    }

    #[test]
    fn test_snapshot_is_coherent_across_second_edge() {
        // Each driver read costs 400 µs, so reads straddle second edges
        let mut clock = MockClock::new(Calendar::new(2024, 6, 1, 12, 0, 0), 0, 7)
            .with_read_cost_us(400);
        let mut time = TimeSource::new(eastern());
        time.anchor(&mut clock);

        for _ in 0..5_000 {
            let ts = time.update(&mut clock);
            let (second, micros) = clock.last_counter_phase();
            // The counter read must belong to the reported second
            assert_eq!(ts.second, second);
            let diff = ts.micros.abs_diff(micros);
            assert!(diff.min(US_PER_S - diff) < 2_000, "{} vs {}", ts.micros, micros);
        }
    }

    #[test]
    fn test_tick_rollover_keeps_sub_second_continuous() {
        // Counter wraps about 0.5 s after the anchor edge
        let start_ticks = u32::MAX - 1_499_999;
        let mut clock = MockClock::new(Calendar::new(2024, 6, 1, 12, 0, 0), 0, start_ticks);
        let mut time = TimeSource::new(eastern());
        time.anchor(&mut clock);

        let mut prev = time.update(&mut clock);
        for _ in 0..200 {
            clock.advance_us(10_000);
            let ts = time.update(&mut clock);
            let step = (ts.micros + US_PER_S - prev.micros) % US_PER_S;
            assert!((9_000..12_000).contains(&step), "step = {}", step);
            prev = ts;
        }
    }

    #[test]
    fn test_epoch_accessors() {
        // 2024-01-01 00:00:00 UTC
        let mut clock = MockClock::new(Calendar::new(2024, 1, 1, 0, 0, 0), 0, 0);
        let mut time = TimeSource::new(eastern());
        time.anchor(&mut clock);
        clock.advance_us(500_000);
        time.update(&mut clock);
        time.apply_local_adjustment();

        let utc = time.epoch_millis(false).unwrap();
        assert!((1_704_067_201_500..1_704_067_201_510).contains(&utc));
        let local = time.epoch_millis(true).unwrap();
        assert_eq!(utc - local, 5 * 3_600_000);

        let float = time.epoch_seconds_float(false).unwrap();
        assert!((float - 1_704_067_201.5).abs() < 0.01);

        let cal = time.local_calendar_time().unwrap();
        assert_eq!((cal.year, cal.month, cal.day, cal.hour), (2023, 12, 31, 19));
        assert_eq!((cal.minute, cal.second), (0, 1));
    }

    #[test]
    fn test_dst_applied_in_summer() {
        let mut clock = MockClock::new(Calendar::new(2024, 7, 4, 16, 0, 0), 0, 0);
        let mut time = TimeSource::new(eastern());
        time.update(&mut clock);
        let adj = time.apply_local_adjustment();
        assert_eq!(adj.hours, -4);
        assert!(time.dst_info().active);
    }

    #[test]
    fn test_unset_rtc() {
        let mut clock = MockClock::new(Calendar::default(), 0, 0);
        let mut time = TimeSource::new(eastern());
        let ts = time.update(&mut clock);
        assert_eq!(ts.day, 0);
        // The pipeline keeps going on raw fields with the standard offset
        assert_eq!(time.apply_local_adjustment().hours, -5);
        assert_eq!(time.epoch_millis(true), Err(TimeError::InvalidCalendar));
        assert_eq!(time.local_calendar_time(), Err(TimeError::InvalidCalendar));
    }
}
