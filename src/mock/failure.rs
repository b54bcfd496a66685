//! Scripted responses and failure injection for the mock runner

use serde_json::Value;
use std::time::Duration;

/// What a scripted command does when run.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Report `ToolError::TimedOut` instead of exiting
    pub timeout: bool,
    /// Written to the path following `--json-output`
    pub json_output: Option<Value>,
    /// Cancellable delay before responding
    pub delay: Option<Duration>,
}

impl Response {
    /// Exit 0 with no output.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timeout: false,
            json_output: None,
            delay: None,
        }
    }

    /// Exit 0 printing `stdout`.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::ok()
        }
    }

    /// Exit with `code` printing `stderr`.
    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: code,
            stderr: stderr.into(),
            ..Self::ok()
        }
    }

    /// Hit the command's timeout.
    pub fn timeout() -> Self {
        Self {
            timeout: true,
            ..Self::ok()
        }
    }

    /// Exit 0 after writing `payload` to the `--json-output` file.
    pub fn json(payload: Value) -> Self {
        Self {
            json_output: Some(payload),
            ..Self::ok()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Behaviour of a scripted background process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessScript {
    /// Exit with `code` on the `polls`-th `try_wait`
    ExitAfter {
        polls: u32,
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Keep running until killed
    RunForever,
}

impl ProcessScript {
    pub fn exit_after(polls: u32, code: i32, stderr: impl Into<String>) -> Self {
        ProcessScript::ExitAfter {
            polls,
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}
