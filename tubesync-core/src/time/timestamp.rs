//! Per-frame time snapshot and local-time offset

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tubesync_hal::Calendar;

/// Errors from the epoch and calendar accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// RTC fields do not form a real date (e.g. day 0 before the RTC is set)
    InvalidCalendar,
}

/// Coherent calendar snapshot with sub-second resolution
///
/// Taken once per frame; every later stage of that frame reads this copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Microseconds into the current second (0..1_000_000)
    pub micros: u32,
}

impl Timestamp {
    /// Combine a calendar reading with a sub-second offset
    pub const fn from_calendar(calendar: Calendar, micros: u32) -> Self {
        Self {
            year: calendar.year,
            month: calendar.month,
            day: calendar.day,
            hour: calendar.hour,
            minute: calendar.minute,
            second: calendar.second,
            micros,
        }
    }

    /// Milliseconds into the current second
    pub const fn millis(&self) -> u16 {
        (self.micros / 1000) as u16
    }

    /// The same instant as a chrono date-time, if the fields are valid
    pub fn to_naive(&self) -> Result<NaiveDateTime, TimeError> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .and_then(|date| {
                date.and_hms_micro_opt(
                    self.hour as u32,
                    self.minute as u32,
                    self.second as u32,
                    self.micros,
                )
            })
            .ok_or(TimeError::InvalidCalendar)
    }

    /// Seconds since the Unix epoch, treating the fields as UTC
    pub fn epoch_seconds(&self) -> Result<i64, TimeError> {
        Ok(self.to_naive()?.and_utc().timestamp())
    }
}

/// Signed offset from RTC time to displayed local time
///
/// Stored as separate components so each hand can add its own unit
/// before carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalAdjustment {
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub millis: i32,
}

impl LocalAdjustment {
    /// No adjustment
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
        millis: 0,
    };

    /// Build an adjustment from a whole number of minutes
    pub const fn from_minutes(total: i32) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
            seconds: 0,
            millis: 0,
        }
    }

    /// Total offset in milliseconds
    pub const fn total_millis(&self) -> i64 {
        self.hours as i64 * 3_600_000
            + self.minutes as i64 * 60_000
            + self.seconds as i64 * 1000
            + self.millis as i64
    }

    /// Total offset as a chrono delta
    pub fn as_delta(&self) -> Option<TimeDelta> {
        TimeDelta::try_milliseconds(self.total_millis())
    }
}

/// Local calendar time with microsecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalCalendarTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl From<NaiveDateTime> for LocalCalendarTime {
    fn from(value: NaiveDateTime) -> Self {
        Self {
            year: value.year(),
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
            micros: value.nanosecond() / 1000,
        }
    }
}
