//! Error taxonomy and stable exit codes
//!
//! Four failure families cover the whole workflow:
//! - `NotFound`: artifact, metadata file or field missing (never retried)
//! - `Timeout`: install, unlock wait, boot, debug-server readiness
//! - `ToolInvocation`: any other non-zero exit from an external tool
//! - `State`: the destination or the launched process is not in a usable state
//!
//! `Cancelled`, `Config` and `Io` cover the ambient layers.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use launch_process::ToolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::destination::DestinationKind;

/// Errors from the build-launch-debug workflow.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{what} not found (probed: {})", display_paths(.probed))]
    NotFound { what: String, probed: Vec<PathBuf> },

    #[error("{operation} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        operation: String,
        elapsed: Duration,
        /// Captured tool output, if any
        output: String,
    },

    #[error("{operation} failed: {source}")]
    ToolInvocation {
        operation: String,
        #[source]
        source: ToolError,
    },

    #[error("{destination}: {message}")]
    State { destination: String, message: String },

    #[error("cancelled during {during}")]
    Cancelled { during: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for workflow operations.
pub type StepResult<T> = Result<T, LaunchError>;

impl LaunchError {
    /// Classify a tool error raised while performing `operation`.
    pub fn from_tool(operation: impl Into<String>, err: ToolError) -> Self {
        let operation = operation.into();
        match err {
            ToolError::TimedOut {
                timeout,
                stdout,
                stderr,
                ..
            } => LaunchError::Timeout {
                operation,
                elapsed: timeout,
                output: join_output(&stdout, &stderr),
            },
            ToolError::Cancelled { .. } => LaunchError::Cancelled { during: operation },
            other => LaunchError::ToolInvocation {
                operation,
                source: other,
            },
        }
    }

    /// Attach context to an I/O error.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        LaunchError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn not_found(what: impl Into<String>, probed: Vec<PathBuf>) -> Self {
        LaunchError::NotFound {
            what: what.into(),
            probed,
        }
    }

    pub fn state(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LaunchError::State {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LaunchError::Timeout { .. })
    }

    /// Failure family.
    pub fn kind(&self) -> FailureKind {
        match self {
            LaunchError::NotFound { .. } => FailureKind::NotFound,
            LaunchError::Timeout { .. } => FailureKind::Timeout,
            LaunchError::ToolInvocation { .. } => FailureKind::ToolInvocation,
            LaunchError::State { .. } => FailureKind::State,
            LaunchError::Cancelled { .. } => FailureKind::Cancelled,
            LaunchError::Config(_) => FailureKind::Config,
            LaunchError::Io { .. } => FailureKind::ToolInvocation,
        }
    }

    /// Captured tool output worth showing alongside the message.
    pub fn captured_output(&self) -> Option<String> {
        let text = match self {
            LaunchError::Timeout { output, .. } => output.clone(),
            LaunchError::ToolInvocation { source, .. } => {
                join_output(source.stdout(), source.stderr())
            }
            _ => String::new(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Operator-facing remediation, specific to the destination kind.
    pub fn remediation(&self, destination: DestinationKind) -> &'static str {
        use DestinationKind::{Device, Simulator};
        match (self, destination) {
            (LaunchError::NotFound { .. }, _) => {
                "Check that the target builds an application bundle and that the \
                 bazel-bin symlink points at the output of the last build."
            }
            (LaunchError::Timeout { .. }, Simulator) => {
                "Check free disk space for CoreSimulator, then try \
                 `xcrun simctl shutdown all` and run again."
            }
            (LaunchError::Timeout { .. }, Device) => {
                "Check the USB cable or network connection, unlock the device and \
                 keep it awake, then run again."
            }
            (LaunchError::ToolInvocation { .. }, Simulator) => {
                "Re-run the failing command shown above to reproduce; make sure the \
                 app was built for the simulator architecture."
            }
            (LaunchError::ToolInvocation { .. }, Device) => {
                "Re-run the failing command shown above to reproduce; make sure the \
                 app is signed with a provisioning profile that includes this device."
            }
            (LaunchError::State { .. }, Simulator) => {
                "The app exited before the debugger could attach; check the simulator \
                 log (`xcrun simctl spawn booted log stream`) for a crash at launch."
            }
            (LaunchError::State { .. }, Device) => {
                "Connect the device with a cable, trust this computer, and confirm it \
                 appears in `xcrun devicectl list devices`."
            }
            (LaunchError::Cancelled { .. }, _) => "The run was cancelled; nothing to fix.",
            (LaunchError::Config(_), _) => "Fix the configuration value named above.",
            (LaunchError::Io { .. }, _) => {
                "Check file permissions and free disk space in the workspace."
            }
        }
    }

    /// Full rendering: message, captured output, remediation.
    pub fn render(&self, destination: DestinationKind) -> String {
        let mut out = format!("error: {}", self);
        if let Some(output) = self.captured_output() {
            let _ = write!(out, "\n\ncaptured output:\n{}", output.trim_end());
        }
        let _ = write!(out, "\n\nhint: {}", self.remediation(destination));
        out
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
    }
}

/// Failure family with a stable exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    NotFound,
    Timeout,
    ToolInvocation,
    State,
    Cancelled,
    Config,
}

impl FailureKind {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::NotFound => ExitCode::NotFound,
            FailureKind::Timeout => ExitCode::Timeout,
            FailureKind::ToolInvocation => ExitCode::ToolInvocation,
            FailureKind::State => ExitCode::State,
            FailureKind::Cancelled => ExitCode::Cancelled,
            FailureKind::Config => ExitCode::Config,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "Required file not found",
            FailureKind::Timeout => "Operation timed out",
            FailureKind::ToolInvocation => "External tool failed",
            FailureKind::State => "Destination or process in unusable state",
            FailureKind::Cancelled => "Run cancelled",
            FailureKind::Config => "Invalid configuration",
        }
    }
}

/// Stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Launched, but the debugger was not attached automatically
    Warning = 2,
    Config = 10,
    NotFound = 20,
    ToolInvocation = 30,
    Timeout = 40,
    State = 50,
    Cancelled = 80,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}
