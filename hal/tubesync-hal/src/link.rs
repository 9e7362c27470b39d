//! Inter-controller word link abstractions
//!
//! The two controllers exchange 16-bit words over a single-wire serial
//! channel (16 data bits, no parity, one stop bit). The primary only
//! transmits and the secondary only receives.

/// Word transmitter
pub trait WordTx {
    /// Error type for transmit operations
    type Error;

    /// Write one word to the link
    ///
    /// Blocks until the word has been queued for transmission.
    fn write_word(&mut self, word: u16) -> Result<(), Self::Error>;

    /// Write a sequence of words
    fn write_words(&mut self, words: &[u16]) -> Result<(), Self::Error> {
        for &word in words {
            self.write_word(word)?;
        }
        Ok(())
    }
}

/// Word receiver
///
/// Reads never block. Cancellable blocking reads are built on top of this
/// by the caller, which polls its own cancellation flag between attempts.
pub trait WordRx {
    /// Error type for receive operations
    type Error;

    /// Take one word from the receive FIFO if one is available
    fn try_read_word(&mut self) -> Result<Option<u16>, Self::Error>;
}

/// Link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// GPIO used for the single-wire link
    pub pin: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            pin: 27,
        }
    }
}
