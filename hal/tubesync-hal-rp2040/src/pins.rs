//! Pin allocation by GPIO number
//!
//! Tube pins come from the configuration, so they are taken from the bank
//! by number at runtime.

use embassy_rp::gpio::AnyPin;
use embassy_rp::peripherals::{CORE1, DMA_CH0, FLASH, PIN_27, PIO0, RTC, WATCHDOG};
use embassy_rp::{Peri, Peripherals};

/// Number of user GPIOs on the RP2040
pub const N_GPIO: usize = 30;

/// GPIO wired to the inter-controller link on the board
pub const BOARD_LINK_PIN: u8 = 27;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
}

/// Pin bank that holds the GPIO pins and hands them out by number
///
/// The link pin is not in the bank.
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; N_GPIO],
}

impl PinBank {
    /// Split the peripherals into the pin bank and everything else
    pub fn from_peripherals(p: Peripherals) -> (Self, RemainingPeripherals) {
        let bank = Self {
            pins: [
                Some(p.PIN_0.into()),
                Some(p.PIN_1.into()),
                Some(p.PIN_2.into()),
                Some(p.PIN_3.into()),
                Some(p.PIN_4.into()),
                Some(p.PIN_5.into()),
                Some(p.PIN_6.into()),
                Some(p.PIN_7.into()),
                Some(p.PIN_8.into()),
                Some(p.PIN_9.into()),
                Some(p.PIN_10.into()),
                Some(p.PIN_11.into()),
                Some(p.PIN_12.into()),
                Some(p.PIN_13.into()),
                Some(p.PIN_14.into()),
                Some(p.PIN_15.into()),
                Some(p.PIN_16.into()),
                Some(p.PIN_17.into()),
                Some(p.PIN_18.into()),
                Some(p.PIN_19.into()),
                Some(p.PIN_20.into()),
                Some(p.PIN_21.into()),
                Some(p.PIN_22.into()),
                Some(p.PIN_23.into()),
                Some(p.PIN_24.into()),
                Some(p.PIN_25.into()),
                Some(p.PIN_26.into()),
                None, // link, see `RemainingPeripherals::link_pin`
                Some(p.PIN_28.into()),
                Some(p.PIN_29.into()),
            ],
        };
        let remaining = RemainingPeripherals {
            core1: p.CORE1,
            flash: p.FLASH,
            link_pin: p.PIN_27,
            dma_ch0: p.DMA_CH0,
            pio0: p.PIO0,
            rtc: p.RTC,
            watchdog: p.WATCHDOG,
        };
        (bank, remaining)
    }

    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin_num as usize)
            .ok_or(PinError::InvalidPin)?
            .take()
            .ok_or(PinError::AlreadyTaken)
    }

    /// Check if a pin is available
    pub fn is_available(&self, pin_num: u8) -> bool {
        matches!(self.pins.get(pin_num as usize), Some(Some(_)))
    }
}

/// Non-GPIO peripherals used by the firmware
pub struct RemainingPeripherals {
    pub core1: Peri<'static, CORE1>,
    pub flash: Peri<'static, FLASH>,
    /// Link pin, kept typed for the PIO
    pub link_pin: Peri<'static, PIN_27>,
    pub dma_ch0: Peri<'static, DMA_CH0>,
    pub pio0: Peri<'static, PIO0>,
    pub rtc: Peri<'static, RTC>,
    pub watchdog: Peri<'static, WATCHDOG>,
}
