//! Shared handles for one orchestration run

use std::sync::Arc;
use std::time::Duration;

use launch_process::{CancelToken, CommandSpec, ToolOutput, ToolRunner};
use tracing::debug;

use crate::config::LaunchConfig;
use crate::error::{LaunchError, StepResult};

/// Runner, cancellation token and configuration, borrowed by every component.
#[derive(Clone)]
pub struct LaunchContext {
    pub runner: Arc<dyn ToolRunner>,
    pub cancel: CancelToken,
    pub config: LaunchConfig,
}

impl LaunchContext {
    pub fn new(runner: Arc<dyn ToolRunner>, cancel: CancelToken, config: LaunchConfig) -> Self {
        Self {
            runner,
            cancel,
            config,
        }
    }

    /// Run `spec`; a non-zero exit is an error classified under `operation`.
    pub fn run_checked(&self, operation: &str, spec: &CommandSpec) -> StepResult<ToolOutput> {
        self.runner
            .run_checked(spec, &self.cancel)
            .map_err(|e| LaunchError::from_tool(operation, e))
    }

    /// Run `spec` returning any exit status; only spawn failures, timeouts and
    /// cancellation are errors.
    pub fn run(&self, operation: &str, spec: &CommandSpec) -> StepResult<ToolOutput> {
        self.runner
            .run(spec, &self.cancel)
            .map_err(|e| LaunchError::from_tool(operation, e))
    }

    /// Run a cleanup command whose failure never matters.
    pub fn run_best_effort(&self, operation: &str, spec: &CommandSpec) -> Option<ToolOutput> {
        match self.runner.run(spec, &self.cancel) {
            Ok(output) => {
                if !output.success() {
                    debug!("{} (ignored): {} returned {}", operation, output.command, output.exit);
                }
                Some(output)
            }
            Err(e) => {
                debug!("{} (ignored): {}", operation, e);
                None
            }
        }
    }

    /// Cancellable sleep.
    pub fn sleep(&self, duration: Duration, during: &str) -> StepResult<()> {
        if self.cancel.sleep(duration) {
            Ok(())
        } else {
            Err(LaunchError::Cancelled {
                during: during.to_string(),
            })
        }
    }

    /// Fail fast when the run has been cancelled.
    pub fn check_cancelled(&self, during: &str) -> StepResult<()> {
        if self.cancel.is_cancelled() {
            Err(LaunchError::Cancelled {
                during: during.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Default timeout for short queries.
    pub fn query_timeout(&self) -> Duration {
        self.config.timeouts.query()
    }
}
