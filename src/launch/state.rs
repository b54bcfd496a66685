//! Installer/Launcher state machine
//!
//! Idle → Terminating → Installing → (InstallTimedOut → RestartingDestination
//! → Installing)* → Launching → Launched | Failed

use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    Idle,
    /// Stopping any previous instance (best effort)
    Terminating,
    Installing,
    /// An install attempt hit its timeout
    InstallTimedOut,
    /// Rebooting the simulator before retrying the install
    RestartingDestination,
    Launching,
    Launched,
    Failed,
}

impl LaunchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LaunchState::Launched | LaunchState::Failed)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: LaunchState) -> bool {
        use LaunchState::*;
        match (self, target) {
            (Idle, Terminating) => true,
            (Terminating, Installing) => true,

            (Installing, InstallTimedOut) => true,
            (Installing, Launching) => true,
            (InstallTimedOut, RestartingDestination) => true,
            (RestartingDestination, Installing) => true,

            (Launching, Launched) => true,

            // Any non-terminal state can fail
            (from, Failed) => !from.is_terminal(),

            _ => false,
        }
    }
}

/// Current state plus every state visited, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchStateMachine {
    state: LaunchState,
    history: Vec<LaunchState>,
    install_attempts: u32,
}

impl Default for LaunchStateMachine {
    fn default() -> Self {
        Self {
            state: LaunchState::Idle,
            history: vec![LaunchState::Idle],
            install_attempts: 0,
        }
    }
}

impl LaunchStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn history(&self) -> &[LaunchState] {
        &self.history
    }

    pub fn install_attempts(&self) -> u32 {
        self.install_attempts
    }

    /// Move to `next`; entering `Installing` counts an attempt.
    pub fn transition(&mut self, next: LaunchState) -> StepResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(LaunchError::state(
                "installer",
                format!("invalid state transition from {:?} to {:?}", self.state, next),
            ));
        }
        if next == LaunchState::Installing {
            self.install_attempts += 1;
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Record a failure unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = LaunchState::Failed;
            self.history.push(LaunchState::Failed);
        }
    }

    pub fn into_history(self) -> Vec<LaunchState> {
        self.history
    }
}
