//! Fixed-rule daylight saving time
//!
//! Only the US rule is implemented: DST starts at 02:00 local standard
//! time on the second Sunday of March and ends at 02:00 local daylight
//! time on the first Sunday of November. Window bounds are kept as UTC
//! epoch seconds so the RTC (which runs on UTC) can be compared directly.

use chrono::{DateTime, Datelike, NaiveDate, Weekday};

use super::timestamp::LocalAdjustment;

const SECS_PER_HOUR: i64 = 3600;
const DST_SHIFT_SECS: i64 = 3600;

/// Local zone rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ZoneConfig {
    /// Standard-time offset from UTC in minutes (US Eastern is -300)
    pub utc_offset_minutes: i32,
    /// Whether the DST rule is applied at all
    pub dst: bool,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: -5 * 60,
            dst: true,
        }
    }
}

impl ZoneConfig {
    fn base_offset_secs(&self) -> i64 {
        self.utc_offset_minutes as i64 * 60
    }
}

/// DST window for one local year, as UTC epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DstWindow {
    /// Local (standard time) year the window belongs to
    pub year: i32,
    /// First second of DST
    pub start: i64,
    /// First second after DST
    pub end: i64,
    /// Epoch range of the local year, used as the cache key
    year_start: i64,
    year_end: i64,
}

impl DstWindow {
    /// Compute the window for a local year
    pub fn for_year(year: i32, zone: &ZoneConfig) -> Option<Self> {
        let base = zone.base_offset_secs();

        let start_local = nth_sunday(year, 3, 2)?.and_hms_opt(2, 0, 0)?;
        let end_local = nth_sunday(year, 11, 1)?.and_hms_opt(2, 0, 0)?;
        let year_start_local = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
        let year_end_local = NaiveDate::from_ymd_opt(year + 1, 1, 1)?.and_hms_opt(0, 0, 0)?;

        Some(Self {
            year,
            start: start_local.and_utc().timestamp() - base,
            end: end_local.and_utc().timestamp() - base - DST_SHIFT_SECS,
            year_start: year_start_local.and_utc().timestamp() - base,
            year_end: year_end_local.and_utc().timestamp() - base,
        })
    }

    /// Check whether a UTC instant falls inside DST
    pub fn contains(&self, epoch_secs: i64) -> bool {
        (self.start..self.end).contains(&epoch_secs)
    }

    fn covers_year_of(&self, epoch_secs: i64) -> bool {
        (self.year_start..self.year_end).contains(&epoch_secs)
    }
}

/// Find the `n`th Sunday of a month by scanning forward from the 1st
fn nth_sunday(year: i32, month: u32, n: u32) -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut seen = 0;
    loop {
        if date.weekday() == Weekday::Sun {
            seen += 1;
            if seen == n {
                return Some(date);
            }
        }
        date = date.succ_opt()?;
        if date.month() != month {
            return None;
        }
    }
}

/// Snapshot of the DST decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DstInfo {
    /// DST currently applied
    pub active: bool,
    /// Window start, UTC epoch seconds (0 if never computed)
    pub window_start: i64,
    /// Window end, UTC epoch seconds (0 if never computed)
    pub window_end: i64,
}

/// Caches the DST decision per clock-hour and the window per year
#[derive(Debug, Clone)]
pub struct DstTracker {
    zone: ZoneConfig,
    window: Option<DstWindow>,
    checked_hour: Option<i64>,
    active: bool,
}

impl DstTracker {
    /// Create a tracker for a zone; nothing is computed until [`update`](Self::update)
    pub const fn new(zone: ZoneConfig) -> Self {
        Self {
            zone,
            window: None,
            checked_hour: None,
            active: false,
        }
    }

    /// Zone rule in use
    pub fn zone(&self) -> ZoneConfig {
        self.zone
    }

    /// Re-evaluate DST for a UTC instant
    ///
    /// Does nothing if this clock-hour was already checked. The window is
    /// only recomputed when the instant leaves the cached local year.
    pub fn update(&mut self, epoch_secs: i64) -> bool {
        if !self.zone.dst {
            self.active = false;
            return false;
        }

        let hour = epoch_secs.div_euclid(SECS_PER_HOUR);
        if self.checked_hour == Some(hour) {
            return self.active;
        }
        self.checked_hour = Some(hour);

        let stale = !matches!(self.window, Some(w) if w.covers_year_of(epoch_secs));
        if stale {
            self.window = local_year(epoch_secs, &self.zone)
                .and_then(|year| DstWindow::for_year(year, &self.zone));
        }

        self.active = self.window.is_some_and(|w| w.contains(epoch_secs));
        self.active
    }

    /// Forget any cached decision
    pub fn invalidate(&mut self) {
        self.checked_hour = None;
        self.window = None;
        self.active = false;
    }

    /// Current offset from UTC to local time
    pub fn adjustment(&self) -> LocalAdjustment {
        let dst_minutes = if self.active { 60 } else { 0 };
        LocalAdjustment::from_minutes(self.zone.utc_offset_minutes + dst_minutes)
    }

    /// Current decision and window bounds
    pub fn info(&self) -> DstInfo {
        match self.window {
            Some(window) => DstInfo {
                active: self.active,
                window_start: window.start,
                window_end: window.end,
            },
            None => DstInfo {
                active: self.active,
                ..DstInfo::default()
            },
        }
    }
}

/// Calendar year in local standard time
fn local_year(epoch_secs: i64, zone: &ZoneConfig) -> Option<i32> {
    DateTime::from_timestamp(epoch_secs + zone.base_offset_secs(), 0).map(|dt| dt.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    /// 2024-03-10 07:00:00 UTC (02:00 EST)
    const START_2024: i64 = 1_710_054_000;
    /// 2024-11-03 06:00:00 UTC (02:00 EDT)
    const END_2024: i64 = 1_730_613_600;

    #[test]
    fn test_window_2024() {
        let window = DstWindow::for_year(2024, &ZoneConfig::default()).unwrap();
        assert_eq!(window.start, START_2024);
        assert_eq!(window.end, END_2024);
    }

    #[test]
    fn test_nth_sunday() {
        // March 2025 starts on a Saturday
        assert_eq!(nth_sunday(2025, 3, 2), NaiveDate::from_ymd_opt(2025, 3, 9));
        // November 2026 starts on a Sunday
        assert_eq!(nth_sunday(2026, 11, 1), NaiveDate::from_ymd_opt(2026, 11, 1));
        assert_eq!(nth_sunday(2025, 2, 5), None);
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let mut tracker = DstTracker::new(ZoneConfig::default());
        assert!(!tracker.update(START_2024 - 1));
        assert!(tracker.update(START_2024));
        assert!(tracker.update(END_2024 - 1));
        assert!(!tracker.update(END_2024));
    }

    #[test]
    fn test_decision_cached_per_hour() {
        let mut tracker = DstTracker::new(ZoneConfig::default());
        // 06:59:59 UTC on switch day: not yet DST
        assert!(!tracker.update(START_2024 - 1));
        // Same clock-hour, earlier second: cached answer
        assert!(!tracker.update(START_2024 - 1800));
        // Next hour re-evaluates
        assert!(tracker.update(START_2024));
    }

    #[test]
    fn test_adjustment() {
        let mut tracker = DstTracker::new(ZoneConfig::default());
        tracker.update(START_2024 + 3600);
        assert_eq!(tracker.adjustment(), LocalAdjustment::from_minutes(-240));

        tracker.update(END_2024 + 3600);
        assert_eq!(tracker.adjustment(), LocalAdjustment::from_minutes(-300));
    }

    #[test]
    fn test_dst_disabled() {
        let mut tracker = DstTracker::new(ZoneConfig {
            utc_offset_minutes: 60,
            dst: false,
        });
        assert!(!tracker.update(START_2024 + 3600));
        assert_eq!(tracker.adjustment().hours, 1);
        assert_eq!(tracker.info(), DstInfo::default());
    }

    #[test]
    fn test_window_follows_year() {
        let mut tracker = DstTracker::new(ZoneConfig::default());
        tracker.update(START_2024 + 3600);
        assert_eq!(tracker.info().window_start, START_2024);

        // 2025-07-01 12:00:00 UTC
        assert!(tracker.update(1_751_371_200));
        let info = tracker.info();
        // 2025-03-09 07:00:00 UTC
        assert_eq!(info.window_start, 1_741_503_600);
    }

    /// Local wall-clock time of a UTC instant
    fn local_time(epoch_secs: i64, offset_secs: i64) -> NaiveDateTime {
        DateTime::from_timestamp(epoch_secs + offset_secs, 0)
            .unwrap()
            .naive_utc()
    }

    proptest! {
        #[test]
        fn window_edges_follow_us_rule(
            year in 2000i32..2100,
            utc_offset_minutes in -12 * 60i32..=14 * 60,
        ) {
            let zone = ZoneConfig { utc_offset_minutes, dst: true };
            let base = zone.base_offset_secs();

            let start_day = nth_sunday(year, 3, 2).unwrap();
            prop_assert_eq!(start_day.weekday(), Weekday::Sun);
            prop_assert!((8..=14).contains(&start_day.day()));

            let end_day = nth_sunday(year, 11, 1).unwrap();
            prop_assert_eq!(end_day.weekday(), Weekday::Sun);
            prop_assert!((1..=7).contains(&end_day.day()));

            let window = DstWindow::for_year(year, &zone).unwrap();
            prop_assert!(window.start < window.end);
            // Starts at 02:00 standard time, ends at 02:00 daylight time
            prop_assert_eq!(
                local_time(window.start, base),
                start_day.and_hms_opt(2, 0, 0).unwrap()
            );
            prop_assert_eq!(
                local_time(window.end, base + DST_SHIFT_SECS),
                end_day.and_hms_opt(2, 0, 0).unwrap()
            );

            // Both edges lie in the year the window is cached for
            prop_assert!(window.covers_year_of(window.start));
            prop_assert!(window.covers_year_of(window.end));
        }
    }
}
