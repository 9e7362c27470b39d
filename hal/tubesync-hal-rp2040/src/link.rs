//! PIO-based 16-bit serial link
//!
//! The controllers share one wire: the primary transmits, the secondary
//! receives. Words are sent LSB first as 16 data bits, no parity, one
//! stop bit. Both programs run at 8 PIO cycles per bit.

use embassy_rp::gpio::{Level, Pull};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, FifoJoin, Instance, PioPin, ShiftDirection,
    StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;
use tubesync_hal::{LinkConfig, WordRx, WordTx};

/// PIO cycles per bit in both programs
pub const CYCLES_PER_BIT: u32 = 8;

/// Data bits per word
pub const WORD_BITS: u32 = 16;

/// Errors from the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Transmit on a receiver or receive on a transmitter
    WrongDirection,
}

/// Which end of the link this state machine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkDirection {
    Transmit,
    Receive,
}

/// Clock divider for a baud rate
///
/// The PIO runs at `sys_clk / divider`, and each bit takes
/// [`CYCLES_PER_BIT`] cycles, so `divider = sys_clk / (8 * baud)`.
pub fn clock_divider(sys_clk_hz: u32, baudrate: u32) -> U24F8 {
    let divisor = CYCLES_PER_BIT as u64 * baudrate.max(1) as u64;
    let bits = ((sys_clk_hz as u64) << 8) / divisor;
    U24F8::from_bits(bits.min(u32::MAX as u64) as u32)
}

/// One end of the word link on a PIO state machine
pub struct PioLink<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    direction: LinkDirection,
}

impl<'d, PIO: Instance, const SM: usize> PioLink<'d, PIO, SM> {
    /// Set up a transmitter on `pin`
    pub fn transmitter(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        pin: Peri<'d, impl PioPin>,
        config: LinkConfig,
    ) -> Self {
        let prg = pio::pio_asm!(
            ".side_set 1 opt",
            "    pull       side 1 [7]", // Stop bit, or idle high while the FIFO is empty
            "    set x, 15  side 0 [7]", // Start bit, 16 data bits to go
            "bitloop:",
            "    out pins, 1",
            "    jmp x-- bitloop [6]",
        );

        let tx_pin = common.make_pio_pin(pin);
        sm.set_pins(Level::High, &[&tx_pin]);
        sm.set_pin_dirs(PioDirection::Out, &[&tx_pin]);

        let mut cfg = Config::default();
        cfg.use_program(&common.load_program(&prg.program), &[&tx_pin]);
        cfg.set_out_pins(&[&tx_pin]);
        cfg.shift_out.auto_fill = false;
        cfg.shift_out.direction = ShiftDirection::Right;
        cfg.fifo_join = FifoJoin::TxOnly;
        cfg.clock_divider = clock_divider(embassy_rp::clocks::clk_sys_freq(), config.baudrate);

        sm.set_config(&cfg);
        sm.set_enable(true);

        Self {
            sm,
            direction: LinkDirection::Transmit,
        }
    }

    /// Set up a receiver on `pin`
    ///
    /// Words with a bad stop bit are dropped by the program; the frame
    /// checksum catches the rest.
    pub fn receiver(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        pin: Peri<'d, impl PioPin>,
        config: LinkConfig,
    ) -> Self {
        let prg = pio::pio_asm!(
            "start:",
            "    wait 0 pin 0",       // Wait for the start bit
            "    set x, 15    [10]",  // Then to the middle of the first data bit
            "bitloop:",
            "    in pins, 1",
            "    jmp x-- bitloop [6]",
            "    jmp pin good_stop",
            "    wait 1 pin 0",       // Framing error or break: wait for idle
            "    jmp start",
            "good_stop:",
            "    push",
        );

        let mut rx_pin = common.make_pio_pin(pin);
        rx_pin.set_pull(Pull::Up);
        sm.set_pin_dirs(PioDirection::In, &[&rx_pin]);

        let mut cfg = Config::default();
        cfg.use_program(&common.load_program(&prg.program), &[]);
        cfg.set_in_pins(&[&rx_pin]);
        cfg.set_jmp_pin(&rx_pin);
        cfg.shift_in.auto_fill = false;
        cfg.shift_in.direction = ShiftDirection::Right;
        cfg.shift_in.threshold = 32;
        cfg.fifo_join = FifoJoin::RxOnly;
        cfg.clock_divider = clock_divider(embassy_rp::clocks::clk_sys_freq(), config.baudrate);

        sm.set_config(&cfg);
        sm.set_enable(true);

        Self {
            sm,
            direction: LinkDirection::Receive,
        }
    }

    pub fn direction(&self) -> LinkDirection {
        self.direction
    }
}

impl<PIO: Instance, const SM: usize> WordTx for PioLink<'_, PIO, SM> {
    type Error = LinkError;

    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        if self.direction != LinkDirection::Transmit {
            return Err(LinkError::WrongDirection);
        }
        while !self.sm.tx().try_push(word as u32) {
            cortex_m::asm::nop();
        }
        Ok(())
    }
}

impl<PIO: Instance, const SM: usize> WordRx for PioLink<'_, PIO, SM> {
    type Error = LinkError;

    fn try_read_word(&mut self) -> Result<Option<u16>, Self::Error> {
        if self.direction != LinkDirection::Receive {
            return Err(LinkError::WrongDirection);
        }
        // Bits were shifted in from the top of the 32-bit ISR
        Ok(self
            .sm
            .rx()
            .try_pull()
            .map(|value| (value >> (32 - WORD_BITS)) as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_divider() {
        // 125 MHz / (8 * 115200) = 135.63
        let div = clock_divider(125_000_000, 115_200);
        assert_eq!(div.to_bits() >> 8, 135);
        assert_eq!(div.to_bits() & 0xFF, 162);

        // 125 MHz / (8 * 1 MBd) = 15.625
        let div = clock_divider(125_000_000, 1_000_000);
        assert_eq!(div.to_bits(), (15 << 8) | 160);
    }
}
