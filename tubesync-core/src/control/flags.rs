//! Cross-core control flags
//!
//! Core 0 requests cancellation and resets; the control loop on core 1
//! polls the flags. All fields are atomics so a `&'static LoopControl` can
//! be shared between the cores.

use portable_atomic::{AtomicBool, Ordering};

/// Errors from loop control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The loop was already started
    AlreadyRunning,
}

/// Something a blocking operation can poll to give up early
pub trait CancelFlag {
    /// Check whether cancellation has been requested
    fn is_cancelled(&self) -> bool;
}

impl CancelFlag for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Never cancels
pub struct NeverCancel;

impl CancelFlag for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared run/cancel/reset flags for one control loop
#[derive(Debug, Default)]
pub struct LoopControl {
    running: AtomicBool,
    cancel: AtomicBool,
    reset: AtomicBool,
}

impl LoopControl {
    /// Create cleared flags
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            reset: AtomicBool::new(false),
        }
    }

    /// Claim the loop; fails if it is already running
    pub fn try_start(&self) -> Result<(), ControlError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ControlError::AlreadyRunning)
    }

    /// Check whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the loop to stop after the current frame
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Ask the loop to stop and then reset the chip
    ///
    /// Ignored unless the loop is running.
    pub fn reset_soon(&self) {
        if !self.is_running() {
            return;
        }
        self.reset.store(true, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
    }

    /// Check whether a reset was requested
    pub fn reset_requested(&self) -> bool {
        self.reset.load(Ordering::Acquire)
    }

    /// Mark the loop as stopped and clear pending requests
    pub(crate) fn finish(&self) {
        self.cancel.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }
}

impl CancelFlag for LoopControl {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}
