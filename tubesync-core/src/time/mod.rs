//! Time acquisition and local-time correction
//!
//! The RTC keeps UTC with one-second resolution. A free-running
//! microsecond counter, anchored to a calendar-second edge, supplies the
//! sub-second part. Local time is UTC plus a fixed base offset plus one
//! hour while the DST window is open.

pub mod dst;
pub mod source;
pub mod timestamp;

pub use dst::{DstInfo, DstTracker, DstWindow, ZoneConfig};
pub use source::{TimeSource, TICKS_ROLLOVER_SHIFT_US, US_PER_S};
pub use timestamp::{LocalAdjustment, LocalCalendarTime, TimeError, Timestamp};
