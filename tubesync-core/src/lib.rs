//! Board-agnostic rendering and synchronization core for the tube clock
//!
//! A ring of 24 tubes shows three "hands" as Gaussian brightness bumps.
//! Two controllers each drive half of the ring; the primary keeps time,
//! renders every tube and streams the far half to the secondary once per
//! frame.
//!
//! - Time acquisition with sub-second precision and DST ([`time`])
//! - Hand positions on a 16-bit circle ([`hands`])
//! - Fixed-point Gaussian rendering ([`fixed`], [`render`])
//! - Brightness to PWM duty mapping with calibration ([`duty`])
//! - Render buffers and host overrides ([`state`])
//! - The per-frame pipeline and its control loop ([`control`])
//! - Configuration types and parsing ([`config`])

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod duty;
pub mod fixed;
pub mod hands;
pub mod render;
pub mod state;
pub mod time;

#[cfg(any(test, feature = "mock"))]
pub mod testing;

/// Tubes in the ring
pub const N_TUBES: usize = 24;

/// Tubes driven by each controller
pub const N_TUBES_HALF: usize = N_TUBES / 2;

// One frame carries exactly the secondary's half
const _: () = assert!(N_TUBES_HALF == tubesync_protocol::DATA_WORDS);
