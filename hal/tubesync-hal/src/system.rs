//! System control abstractions

/// Delays and hardware reset
pub trait SystemControl {
    /// Busy-wait for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Reset the chip
    ///
    /// Never returns.
    fn reset(&mut self) -> !;
}
