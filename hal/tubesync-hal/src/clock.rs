//! Real-time clock and tick counter abstractions
//!
//! The clock hardware is two independent sources: a calendar register with
//! one-second resolution and a free-running microsecond counter that wraps
//! at 2^32. Each read is glitch-free on its own, but the two are not
//! sampled atomically together; callers that need a coherent pair must use
//! a retry-read pattern.

/// Calendar register contents
///
/// Fields are the raw register values; no validation is performed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calendar {
    /// Full year (e.g. 2025)
    pub year: u16,
    /// Month, 1-12
    pub month: u8,
    /// Day of month, 1-31
    pub day: u8,
    /// Hour, 0-23
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
    /// Second, 0-59
    pub second: u8,
}

impl Calendar {
    /// Create a calendar value
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }
}

/// Clock driver
///
/// Combines the calendar register and the microsecond tick counter.
pub trait ClockDriver {
    /// Read the calendar register
    fn read_calendar(&mut self) -> Calendar;

    /// Read the free-running microsecond counter
    ///
    /// Wraps around at 2^32 µs (about 71.6 minutes).
    fn ticks_us(&mut self) -> u32;
}
