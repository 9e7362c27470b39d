//! PWM slices driving the tubes
//!
//! GPIO `n` is channel `n & 1` (A or B) of slice `(n >> 1) & 7`. Tube pins
//! are chosen at runtime, so the slices are programmed through registers
//! rather than the typed `embassy_rp::pwm` driver. All slices share one
//! period set by the bit depth.

use embassy_rp::gpio::{AnyPin, Flex, Pin};
use embassy_rp::pac;
use embassy_rp::Peri;
use tubesync_hal::PwmBank;

/// PWM slices on the RP2040
pub const N_SLICES: usize = 8;

/// Pins driven by one controller
pub const BANK_PINS: usize = 12;

/// IO_BANK0 function select for PWM
const FUNCSEL_PWM: u8 = 4;

/// Slice and channel of a GPIO
pub const fn slice_of(pin: u8) -> (usize, bool) {
    (((pin >> 1) & 7) as usize, pin & 1 == 1)
}

/// PWM outputs of one controller
///
/// Holds the driven pins and parks the other half of the tube pins as
/// inputs, so both controllers can share a wiring harness.
pub struct Rp2040PwmBank<'d> {
    active_mask: u32,
    _active: [Option<Peri<'d, AnyPin>>; BANK_PINS],
    _parked: [Option<Flex<'d>>; BANK_PINS],
}

impl<'d> Rp2040PwmBank<'d> {
    /// Route `active` pins to their PWM slices and park `parked` pins
    ///
    /// Extra pins beyond [`BANK_PINS`] are ignored.
    pub fn new(
        active: impl IntoIterator<Item = Peri<'d, AnyPin>>,
        parked: impl IntoIterator<Item = Peri<'d, AnyPin>>,
    ) -> Self {
        let mut bank = Self {
            active_mask: 0,
            _active: core::array::from_fn(|_| None),
            _parked: core::array::from_fn(|_| None),
        };

        for (slot, pin) in bank._active.iter_mut().zip(active) {
            let n = pin.pin();
            pac::IO_BANK0
                .gpio(n as usize)
                .ctrl()
                .write(|w| w.set_funcsel(FUNCSEL_PWM));
            bank.active_mask |= 1 << n;
            *slot = Some(pin);
        }

        for (slot, pin) in bank._parked.iter_mut().zip(parked) {
            let mut flex = Flex::new(pin);
            flex.set_as_input();
            *slot = Some(flex);
        }

        bank
    }

    /// Whether `pin` is driven by this bank
    pub fn drives(&self, pin: u8) -> bool {
        pin < 32 && self.active_mask & (1 << pin) != 0
    }
}

impl PwmBank for Rp2040PwmBank<'_> {
    fn set_wrap_bits(&mut self, bits: u8) {
        let wrap = 1u16 << bits.min(15);
        for slice in 0..N_SLICES {
            let ch = pac::PWM.ch(slice);
            ch.div().write(|w| {
                w.set_int(1);
                w.set_frac(0);
            });
            ch.top().write(|w| w.set_top(wrap));
            ch.csr().modify(|w| w.set_en(true));
        }
    }

    fn set_level(&mut self, pin: u8, level: u16) {
        if !self.drives(pin) {
            return;
        }
        let (slice, channel_b) = slice_of(pin);
        pac::PWM.ch(slice).cc().modify(|w| {
            if channel_b {
                w.set_b(level);
            } else {
                w.set_a(level);
            }
        });
    }
}
