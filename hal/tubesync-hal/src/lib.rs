//! Tubesync Hardware Abstraction Layer
//!
//! This crate defines the hardware boundary of the clock firmware. The
//! rendering core in `tubesync-core` only talks to these traits, so the
//! whole pipeline can run on the host against mocks and on the RP2040
//! against `tubesync-hal-rp2040`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tubesync-core (pipeline, control loop) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tubesync-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!           ┌───────────────────┐
//!           │ tubesync-hal-     │
//!           │    rp2040         │
//!           └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`clock::ClockDriver`] - Calendar register and free-running µs ticks
//! - [`link::WordTx`], [`link::WordRx`] - 16-bit word link between controllers
//! - [`pwm::PwmBank`] - Bank of PWM outputs driving the tubes
//! - [`system::SystemControl`] - Delays and hardware reset
//! - [`flash::FlashStorage`] - Persistent storage

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod flash;
pub mod link;
pub mod pwm;
pub mod system;

// Re-export key traits at crate root for convenience
pub use clock::{Calendar, ClockDriver};
pub use flash::{FlashError, FlashStorage, StorageKey};
pub use link::{LinkConfig, WordRx, WordTx};
pub use pwm::PwmBank;
pub use system::SystemControl;
