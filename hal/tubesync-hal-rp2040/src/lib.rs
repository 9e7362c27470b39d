//! RP2040-specific HAL for the tube clock firmware
//!
//! Implementations of the `tubesync-hal` traits on the RP2040:
//!
//! - Calendar from the RTC, microsecond ticks from the system timer
//! - PIO-based 16-bit single-wire link between the controllers
//! - PWM slices driving the tubes, with pins chosen at runtime
//! - Watchdog reset
//! - Flash storage driver (implements `tubesync_hal::FlashStorage`)

#![no_std]

pub mod clock;
pub mod flash;
pub mod link;
pub mod pins;
pub mod pwm;
pub mod system;

// Re-export shared traits from tubesync-hal for convenience
pub use tubesync_hal::{FlashStorage as FlashStorageTrait, StorageKey};
