//! Interrupt handling (SIGINT/SIGTERM)
//!
//! On the first signal the run's [`CancelToken`] is cancelled: every wait
//! loop and tool invocation stops at its next check and the run ends with
//! `Cancelled` (exit code 80).
//!
//! On a second signal the process exits immediately with the same code.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use launch_process::CancelToken;

use crate::error::ExitCode;

/// Signal handler state
#[derive(Debug)]
pub struct SignalState {
    signal_count: AtomicU8,
    cancel: CancelToken,
}

impl SignalState {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            signal_count: AtomicU8::new(0),
            cancel,
        }
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record one signal and decide what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        match count {
            0 => {
                self.cancel.cancel();
                SignalAction::InitiateCancellation
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel the run in progress
    InitiateCancellation,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal
    Ignore,
}

/// Install the process-wide handler. Call once at startup.
pub fn install(cancel: CancelToken) -> Result<Arc<SignalState>, ctrlc::Error> {
    let state = Arc::new(SignalState::new(cancel));
    let handler_state = Arc::clone(&state);
    ctrlc::set_handler(move || match handler_state.handle_signal() {
        SignalAction::InitiateCancellation => {
            eprintln!("\nInterrupted; stopping (press Ctrl-C again to exit immediately)...");
        }
        SignalAction::ImmediateExit => {
            eprintln!("\nReceived second interrupt, exiting immediately");
            std::process::exit(ExitCode::Cancelled.as_i32());
        }
        SignalAction::Ignore => {}
    })?;
    Ok(state)
}
