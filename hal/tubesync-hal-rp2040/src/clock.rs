//! RTC calendar and system timer ticks

use embassy_rp::peripherals::RTC;
use embassy_rp::rtc::Rtc;
use embassy_rp::Peri;
use embassy_time::Instant;
use tubesync_hal::{Calendar, ClockDriver};

/// Clock driver backed by the RP2040 RTC and the 1 MHz system timer
pub struct Rp2040Clock<'d> {
    rtc: Rtc<'d, RTC>,
}

impl<'d> Rp2040Clock<'d> {
    pub fn new(rtc: Peri<'d, RTC>) -> Self {
        Self { rtc: Rtc::new(rtc) }
    }

    /// Whether the RTC has been set and is counting
    pub fn is_running(&self) -> bool {
        self.rtc.is_running()
    }
}

impl ClockDriver for Rp2040Clock<'_> {
    fn read_calendar(&mut self) -> Calendar {
        // An unset RTC reads as day 0, which the core treats as invalid
        match self.rtc.now() {
            Ok(now) => Calendar::new(now.year, now.month, now.day, now.hour, now.minute, now.second),
            Err(_) => Calendar::default(),
        }
    }

    fn ticks_us(&mut self) -> u32 {
        // Low word of the 64-bit timer, same as TIMERAWL
        Instant::now().as_micros() as u32
    }
}
