//! Frame loop control
//!
//! The loop runs alone on core 1. Core 0 talks to it only through a shared
//! [`LoopControl`] (start, cancel, reset) and reads [`LinkStats`].
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start──> Running ──cancel──> Cancelling ──cleanup──> Stopped
//!                                          │
//!                                          └──reset requested──> chip reset
//! ```

pub mod flags;
pub mod machine;
pub mod pipeline;
pub mod runner;
pub mod stats;

pub use flags::{CancelFlag, ControlError, LoopControl, NeverCancel};
pub use machine::{LoopEvent, LoopState};
pub use pipeline::Pipeline;
pub use runner::{ControlLoop, RESET_DELAY_MS};
pub use stats::{FrameCounter, LinkStats};
