//! PWM output abstractions
//!
//! One bank of PWM channels drives the tubes owned by a controller. All
//! channels share one period, expressed as a bit depth: the counter wraps
//! at `2^bits`.

/// Bank of PWM outputs
pub trait PwmBank {
    /// Reconfigure every channel in the bank for a new bit depth
    ///
    /// Callers only pass depths in 2..=15.
    fn set_wrap_bits(&mut self, bits: u8);

    /// Set the compare level of the channel attached to `pin`
    ///
    /// Pins outside the bank are ignored.
    fn set_level(&mut self, pin: u8, level: u16);
}
