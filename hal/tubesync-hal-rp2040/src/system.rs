//! Delays and watchdog reset

use embassy_rp::peripherals::WATCHDOG;
use embassy_rp::watchdog::Watchdog;
use embassy_rp::Peri;
use embassy_time::Delay;
use embedded_hal::delay::DelayNs;
use tubesync_hal::SystemControl;

/// System control for the RP2040
pub struct Rp2040System {
    watchdog: Watchdog,
    delay: Delay,
}

impl Rp2040System {
    pub fn new(watchdog: Peri<'static, WATCHDOG>) -> Self {
        Self {
            watchdog: Watchdog::new(watchdog),
            delay: Delay,
        }
    }
}

impl SystemControl for Rp2040System {
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn reset(&mut self) -> ! {
        self.watchdog.trigger_reset();
        loop {
            cortex_m::asm::nop();
        }
    }
}
