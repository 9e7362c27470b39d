//! Host-side HAL mocks
//!
//! Used by this crate's tests and, with the `mock` feature, by integration
//! tests driving the full pipeline without hardware.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use heapless::{Deque, Vec};
use tubesync_hal::{Calendar, ClockDriver, PwmBank, SystemControl, WordRx, WordTx};

use crate::control::LoopControl;
use crate::time::US_PER_S;

/// Simulated RTC plus µs counter sharing one timeline
///
/// Every driver read advances simulated time by a fixed read cost before
/// sampling, so retry paths around second edges get exercised. An invalid
/// base calendar (an unset RTC) never ticks.
#[derive(Debug, Clone)]
pub struct MockClock {
    base: Calendar,
    base_time: Option<NaiveDateTime>,
    /// µs since the start of the base second
    elapsed_us: u64,
    phase_us: u64,
    start_ticks: u32,
    read_cost_us: u64,
    last_tick_read_us: u64,
}

impl MockClock {
    /// Start `phase_us` into the second `calendar`, with the counter reading
    /// `start_ticks`
    pub fn new(calendar: Calendar, phase_us: u32, start_ticks: u32) -> Self {
        let base_time = NaiveDate::from_ymd_opt(
            calendar.year as i32,
            calendar.month as u32,
            calendar.day as u32,
        )
        .and_then(|date| {
            date.and_hms_opt(
                calendar.hour as u32,
                calendar.minute as u32,
                calendar.second as u32,
            )
        });

        Self {
            base: calendar,
            base_time,
            elapsed_us: phase_us as u64,
            phase_us: phase_us as u64,
            start_ticks,
            read_cost_us: 1,
            last_tick_read_us: phase_us as u64,
        }
    }

    /// Set the simulated time each driver read takes
    pub fn with_read_cost_us(mut self, cost: u64) -> Self {
        self.read_cost_us = cost;
        self
    }

    /// Let time pass without reading
    pub fn advance_us(&mut self, us: u64) {
        self.elapsed_us += us;
    }

    /// True calendar second and sub-second µs at the last counter read
    pub fn last_counter_phase(&self) -> (u8, u32) {
        let second = self.calendar_at(self.last_tick_read_us).second;
        let micros = (self.last_tick_read_us % US_PER_S as u64) as u32;
        (second, micros)
    }

    fn calendar_at(&self, elapsed_us: u64) -> Calendar {
        let Some(base) = self.base_time else {
            return self.base;
        };
        let seconds = (elapsed_us / US_PER_S as u64) as i64;
        let now = base + TimeDelta::seconds(seconds);
        Calendar::new(
            now.year() as u16,
            now.month() as u8,
            now.day() as u8,
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        )
    }
}

impl ClockDriver for MockClock {
    fn read_calendar(&mut self) -> Calendar {
        self.elapsed_us += self.read_cost_us;
        self.calendar_at(self.elapsed_us)
    }

    fn ticks_us(&mut self) -> u32 {
        self.elapsed_us += self.read_cost_us;
        self.last_tick_read_us = self.elapsed_us;
        self.start_ticks
            .wrapping_add((self.elapsed_us - self.phase_us) as u32)
    }
}

/// Errors from [`MockLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockLinkError {
    /// Transmission failure injected by the test
    Injected,
}

const SENT_CAPACITY: usize = 1024;
const RX_CAPACITY: usize = 128;

/// Loopback-free word link
///
/// Transmitted words are logged; received words come from a queue the test
/// fills. When the receive queue runs dry the link can raise a cancel
/// request, standing in for the host cancelling a waiting secondary.
#[derive(Debug, Default)]
pub struct MockLink<'a> {
    sent: Vec<u16, SENT_CAPACITY>,
    rx: Deque<u16, RX_CAPACITY>,
    fail_tx: bool,
    cancel_when_drained: Option<&'a LoopControl>,
}

impl<'a> MockLink<'a> {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            rx: Deque::new(),
            fail_tx: false,
            cancel_when_drained: None,
        }
    }

    /// Make every following write fail
    pub fn fail_tx(&mut self, fail: bool) {
        self.fail_tx = fail;
    }

    /// Request cancellation on `control` once the receive queue is empty
    pub fn cancel_when_drained(&mut self, control: &'a LoopControl) {
        self.cancel_when_drained = Some(control);
    }

    /// Queue words for the receiver
    ///
    /// # Panics
    ///
    /// If the queue overflows.
    pub fn queue_rx(&mut self, words: &[u16]) {
        for &word in words {
            if self.rx.push_back(word).is_err() {
                panic!("mock receive queue full");
            }
        }
    }

    /// Recently transmitted words, oldest first
    ///
    /// Older words are discarded once the log fills up.
    pub fn sent_words(&self) -> &[u16] {
        &self.sent
    }

    /// The last transmitted frame, if at least one frame's worth was sent
    pub fn last_sent_frame(&self) -> Option<[u16; tubesync_protocol::FRAME_WORDS]> {
        let len = self.sent.len();
        let start = len.checked_sub(tubesync_protocol::FRAME_WORDS)?;
        self.sent[start..].try_into().ok()
    }
}

impl WordTx for MockLink<'_> {
    type Error = MockLinkError;

    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        if self.fail_tx {
            return Err(MockLinkError::Injected);
        }
        if self.sent.is_full() {
            let half = self.sent.len() / 2;
            self.sent.rotate_left(half);
            self.sent.truncate(SENT_CAPACITY - half);
        }
        // Room was made above
        let _ = self.sent.push(word);
        Ok(())
    }
}

impl WordRx for MockLink<'_> {
    type Error = MockLinkError;

    fn try_read_word(&mut self) -> Result<Option<u16>, Self::Error> {
        match self.rx.pop_front() {
            Some(word) => Ok(Some(word)),
            None => {
                if let Some(control) = self.cancel_when_drained {
                    control.request_cancel();
                }
                Ok(None)
            }
        }
    }
}

/// Number of GPIOs recorded by [`MockPwm`]
pub const MOCK_PINS: usize = 30;

/// PWM bank that records its configuration
#[derive(Debug, Clone, Default)]
pub struct MockPwm {
    /// Last level set per GPIO
    pub levels: [u16; MOCK_PINS],
    /// Last configured bit depth
    pub wrap_bits: Option<u8>,
    /// Number of bit-depth reconfigurations
    pub reconfigurations: u32,
}

impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PwmBank for MockPwm {
    fn set_wrap_bits(&mut self, bits: u8) {
        self.wrap_bits = Some(bits);
        self.reconfigurations += 1;
    }

    fn set_level(&mut self, pin: u8, level: u16) {
        if let Some(slot) = self.levels.get_mut(pin as usize) {
            *slot = level;
        }
    }
}

/// System control that records delays and panics on reset
#[derive(Debug, Clone, Default)]
pub struct MockSystem {
    /// Total requested delay
    pub delayed_ms: u32,
}

impl MockSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemControl for MockSystem {
    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += ms;
    }

    fn reset(&mut self) -> ! {
        panic!("system reset after {} ms", self.delayed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_ticks_across_minute() {
        let mut clock = MockClock::new(Calendar::new(2024, 12, 31, 23, 59, 59), 999_990, 0);
        assert_eq!(clock.read_calendar().second, 59);
        clock.advance_us(20);
        let cal = clock.read_calendar();
        assert_eq!((cal.year, cal.month, cal.day), (2025, 1, 1));
        assert_eq!((cal.hour, cal.minute, cal.second), (0, 0, 0));
    }

    #[test]
    fn test_counter_wraps() {
        let mut clock = MockClock::new(Calendar::new(2024, 1, 1, 0, 0, 0), 0, u32::MAX);
        assert_eq!(clock.ticks_us(), 0);
    }

    #[test]
    fn test_sent_log_keeps_latest_words() {
        let mut link = MockLink::new();
        for word in 0..(SENT_CAPACITY as u16 + 10) {
            link.write_word(word).unwrap();
        }
        let sent = link.sent_words();
        assert_eq!(sent.last(), Some(&(SENT_CAPACITY as u16 + 9)));
        assert!(sent.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }
}
