//! Launcher lifecycle state machine.
//!
//! The supervisor moves through a fixed set of states; anything else is
//! a bug, so transitions are validated rather than assumed.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Pre-flight check in progress.
    Init,
    /// Pre-flight failed; nothing was started.
    Aborted,
    /// Service runners are being spawned.
    Starting,
    /// Both runners launched; waiting for an interrupt or for the
    /// services to exit.
    Running,
    /// Interrupt received; children are being stopped.
    ShuttingDown,
    Stopped,
}

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("invalid launcher state transition: {0:?} -> {1:?}")]
    Invalid(State, State),
}

pub struct StateMachine {
    state: State,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self { state: State::Init }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn can_transition(&self, to: State) -> bool {
        matches!(
            (self.state, to),
            (State::Init, State::Aborted)
                | (State::Init, State::Starting)
                | (State::Starting, State::Running)
                | (State::Running, State::ShuttingDown)
                | (State::Running, State::Stopped)
                | (State::ShuttingDown, State::Stopped)
        )
    }

    pub fn transition(&mut self, to: State) -> Result<(), TransitionError> {
        if self.can_transition(to) {
            tracing::debug!("Launcher state: {:?} -> {:?}", self.state, to);
            self.state = to;
            Ok(())
        } else {
            Err(TransitionError::Invalid(self.state, to))
        }
    }
}
