//! Debug Server Controller state machine
//!
//! Idle → CleaningUp → Starting → WaitingForReady → Ready | Failed.
//! Devices skip CleaningUp: nothing local listens for them.

use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebugServerState {
    Idle,
    CleaningUp,
    Starting,
    WaitingForReady,
    Ready,
    Failed,
}

impl DebugServerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DebugServerState::Ready | DebugServerState::Failed)
    }

    pub fn can_transition_to(&self, target: DebugServerState) -> bool {
        use DebugServerState::*;
        match (self, target) {
            (Idle, CleaningUp) => true,
            (Idle, Starting) => true,
            (CleaningUp, Starting) => true,
            (Starting, WaitingForReady) => true,
            (WaitingForReady, Ready) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugServerStateMachine {
    state: DebugServerState,
    history: Vec<DebugServerState>,
}

impl Default for DebugServerStateMachine {
    fn default() -> Self {
        Self {
            state: DebugServerState::Idle,
            history: vec![DebugServerState::Idle],
        }
    }
}

impl DebugServerStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DebugServerState {
        self.state
    }

    pub fn transition(&mut self, next: DebugServerState) -> StepResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(LaunchError::state(
                "debug server",
                format!("invalid state transition from {:?} to {:?}", self.state, next),
            ));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = DebugServerState::Failed;
            self.history.push(DebugServerState::Failed);
        }
    }

    pub fn into_history(self) -> Vec<DebugServerState> {
        self.history
    }
}
