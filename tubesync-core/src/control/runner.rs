//! Frame loop of one controller

use tubesync_hal::{ClockDriver, PwmBank, SystemControl, WordRx, WordTx};

use crate::config::Role;
use crate::render::HandMask;

use super::flags::{CancelFlag, ControlError, LoopControl};
use super::machine::{LoopEvent, LoopState};
use super::pipeline::Pipeline;
use super::stats::{FrameCounter, LinkStats};

/// Delay before a requested reset, so the host can drain its connection
pub const RESET_DELAY_MS: u32 = 500;

/// Repeats the pipeline stages of one role until cancelled
///
/// Primary frame: time, hands, render, duty, encode, send, paint.
/// Secondary frame: time, receive, paint.
pub struct ControlLoop<'a, C, L, P, S> {
    pipeline: Pipeline<C, L, P>,
    system: S,
    control: &'a LoopControl,
    stats: &'a LinkStats,
    counter: FrameCounter,
    state: LoopState,
    mask: HandMask,
}

impl<'a, C, L, P, S> ControlLoop<'a, C, L, P, S>
where
    C: ClockDriver,
    L: WordTx + WordRx,
    P: PwmBank,
    S: SystemControl,
{
    /// Wrap a pipeline in a loop driven by `control`
    pub fn new(
        pipeline: Pipeline<C, L, P>,
        system: S,
        control: &'a LoopControl,
        stats: &'a LinkStats,
    ) -> Self {
        Self {
            pipeline,
            system,
            control,
            stats,
            counter: FrameCounter::new(),
            state: LoopState::Idle,
            mask: HandMask::ALL,
        }
    }

    /// Lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Hands drawn by the primary
    pub fn set_hand_mask(&mut self, mask: HandMask) {
        self.mask = mask;
    }

    pub fn pipeline(&self) -> &Pipeline<C, L, P> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline<C, L, P> {
        &mut self.pipeline
    }

    /// Claim the shared `running` flag
    pub fn start(&mut self) -> Result<(), ControlError> {
        if self.state != LoopState::Idle {
            return Err(ControlError::AlreadyRunning);
        }
        self.control.try_start()?;
        self.state = self.state.transition(LoopEvent::Start);
        Ok(())
    }

    /// Draw one frame
    ///
    /// Returns `false` once cancellation has been observed, either before
    /// the frame or while the secondary waited for one.
    pub fn step(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        if self.control.is_cancelled() {
            self.state = self.state.transition(LoopEvent::CancelRequested);
            return false;
        }

        let drawn = match self.pipeline.role() {
            Role::Primary => self.step_primary(),
            Role::Secondary => self.step_secondary(),
        };
        if !drawn {
            self.state = self.state.transition(LoopEvent::CancelRequested);
            return false;
        }

        let second = self.pipeline.calendar_second();
        self.counter.count(second, self.stats);
        true
    }

    fn step_primary(&mut self) -> bool {
        self.pipeline.update_time();
        self.pipeline.update_hand_positions();
        self.pipeline.render(self.mask);
        self.pipeline.update_duty();

        let sent = match self.pipeline.encode_frame() {
            Ok(()) => self.pipeline.send_frame().is_ok(),
            Err(_) => false,
        };
        if !sent {
            self.stats.count_tx_error();
        }

        self.pipeline.paint();
        true
    }

    fn step_secondary(&mut self) -> bool {
        self.pipeline.update_time();
        if !self.pipeline.receive_frame(self.control, self.stats) {
            return false;
        }
        self.pipeline.paint();
        true
    }

    /// Start if needed, draw frames until cancelled, then clean up
    ///
    /// If a reset was requested the chip is reset after
    /// [`RESET_DELAY_MS`] and this never returns. Otherwise `running` is
    /// cleared and the pipeline is handed back.
    pub fn run(mut self) -> Result<Pipeline<C, L, P>, ControlError> {
        if self.state == LoopState::Idle {
            self.start()?;
        }
        while self.step() {}
        Ok(self.cleanup())
    }

    fn cleanup(mut self) -> Pipeline<C, L, P> {
        if self.control.reset_requested() {
            self.system.delay_ms(RESET_DELAY_MS);
            self.system.reset();
        }
        self.control.finish();
        self.state = self.state.transition(LoopEvent::CleanupDone);
        self.pipeline
    }
}
