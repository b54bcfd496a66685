//! Human-readable progress reporting
//!
//! Progress text is what the operator watches scroll by; diagnostics go
//! through `tracing` instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Major workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Build,
    Destination,
    Locate,
    Prepare,
    Install,
    Launch,
    DebugServer,
    Attach,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Build => "build",
            Step::Destination => "destination",
            Step::Locate => "locate",
            Step::Prepare => "prepare",
            Step::Install => "install",
            Step::Launch => "launch",
            Step::DebugServer => "debug-server",
            Step::Attach => "attach",
        };
        f.write_str(name)
    }
}

/// Sink for progress lines.
pub trait ProgressSink: Send + Sync {
    /// A step made progress.
    fn step(&self, step: Step, message: &str);

    /// A recoverable problem worth showing the operator.
    fn warn(&self, step: Step, message: &str);
}

/// Writes progress to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn step(&self, step: Step, message: &str) {
        eprintln!("[{}] {}", step, message);
    }

    fn warn(&self, step: Step, message: &str) {
        eprintln!("[{}] warning: {}", step, message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn step(&self, _step: Step, _message: &str) {}

    fn warn(&self, _step: Step, _message: &str) {}
}
