//! Embassy async tasks on core 0
//!
//! The control loop itself runs on core 1 outside the executor.

pub mod stats;

pub use stats::{stats_task, LoopExit, LOOP_EXIT};
