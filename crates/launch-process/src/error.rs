//! Tool execution errors

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {}", describe_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs_f64())]
    TimedOut {
        command: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    /// True for a timeout specifically (not a generic failure).
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::TimedOut { .. })
    }

    /// True when the run was cut short by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }

    /// Captured stdout, when the tool got far enough to produce any.
    pub fn stdout(&self) -> &str {
        match self {
            ToolError::Failed { stdout, .. } | ToolError::TimedOut { stdout, .. } => stdout,
            _ => "",
        }
    }

    /// Captured stderr, when the tool got far enough to produce any.
    pub fn stderr(&self) -> &str {
        match self {
            ToolError::Failed { stderr, .. } | ToolError::TimedOut { stderr, .. } => stderr,
            _ => "",
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
