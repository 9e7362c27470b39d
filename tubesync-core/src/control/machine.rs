//! Control loop lifecycle
//!
//! Both roles share the same lifecycle. It only ever moves forward: a
//! stopped loop is not restarted in place, a new one is built instead.

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopState {
    /// Built but not started
    #[default]
    Idle,
    /// Drawing frames
    Running,
    /// Cancel observed; finishing the current frame and cleaning up
    Cancelling,
    /// Cleanup done, `running` cleared
    Stopped,
}

/// Events driving the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopEvent {
    /// Start accepted
    Start,
    /// Cancel flag observed
    CancelRequested,
    /// Cleanup finished without reset
    CleanupDone,
}

impl LoopState {
    /// Check whether frames are being drawn
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running)
    }

    /// Check whether the loop has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Stopped)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LoopEvent) -> Self {
        use LoopEvent::*;
        use LoopState::*;

        match (self, event) {
            (Idle, Start) => Running,
            (Running, CancelRequested) => Cancelling,
            (Cancelling, CleanupDone) => Stopped,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let state = LoopState::default();
        assert_eq!(state, LoopState::Idle);

        let state = state.transition(LoopEvent::Start);
        assert!(state.is_running());

        let state = state.transition(LoopEvent::CancelRequested);
        assert_eq!(state, LoopState::Cancelling);

        let state = state.transition(LoopEvent::CleanupDone);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_start_only_from_idle() {
        for state in [LoopState::Running, LoopState::Cancelling, LoopState::Stopped] {
            assert_eq!(state.transition(LoopEvent::Start), state);
        }
    }

    #[test]
    fn test_out_of_order_events_ignored() {
        assert_eq!(
            LoopState::Idle.transition(LoopEvent::CancelRequested),
            LoopState::Idle
        );
        assert_eq!(
            LoopState::Running.transition(LoopEvent::CleanupDone),
            LoopState::Running
        );
        assert_eq!(
            LoopState::Stopped.transition(LoopEvent::CancelRequested),
            LoopState::Stopped
        );
    }
}
