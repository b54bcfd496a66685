//! Installer/Launcher
//!
//! Terminates any previous instance, installs (rebooting a simulator and
//! retrying when an install times out), then launches paused-at-entry when
//! a debugger will attach.

mod output;
mod state;

pub use output::{
    parse_devicectl_pid, parse_simctl_pid, LaunchOutput, LaunchResult, PidParseError,
};
pub use state::{LaunchState, LaunchStateMachine};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use crate::context::LaunchContext;
use crate::destination::{DestinationKind, ExecutionDestination};
use crate::error::{LaunchError, StepResult};
use crate::progress::{ProgressSink, Step};
use crate::xcrun::{Devicectl, Simctl};

/// Caller-supplied run options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Arguments passed to the app, in order
    pub args: Vec<String>,
    /// Environment for the app (unprefixed names)
    pub env: BTreeMap<String, String>,
    /// Start paused, waiting for a debugger
    pub debug: bool,
}

/// Rename `env` under the launch tool's child prefix so the app, not the
/// tool, receives it. Names already carrying the prefix are kept.
pub fn child_environment(
    kind: DestinationKind,
    env: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let prefix = kind.child_env_prefix();
    env.iter()
        .map(|(name, value)| {
            let name = if name.starts_with(prefix) {
                name.clone()
            } else {
                format!("{}{}", prefix, name)
            };
            (name, value.clone())
        })
        .collect()
}

/// Result of one install-and-launch, with the states it went through.
#[derive(Debug)]
pub struct LaunchRun {
    pub history: Vec<LaunchState>,
    pub install_attempts: u32,
    pub outcome: StepResult<LaunchResult>,
}

/// What to install and launch.
#[derive(Debug, Clone, Copy)]
pub struct LaunchPlan<'p> {
    pub destination: &'p ExecutionDestination,
    pub artifact: &'p Path,
    pub bundle_id: &'p str,
    /// Bundle name without `.app`, used to find running instances on a device
    pub app_name: &'p str,
    pub options: &'p LaunchOptions,
}

pub struct Launcher<'a> {
    ctx: &'a LaunchContext,
    progress: &'a dyn ProgressSink,
}

impl<'a> Launcher<'a> {
    pub fn new(ctx: &'a LaunchContext, progress: &'a dyn ProgressSink) -> Self {
        Self { ctx, progress }
    }

    /// Run the state machine to `Launched` or `Failed`.
    pub fn install_and_launch(&self, plan: LaunchPlan<'_>) -> LaunchRun {
        let mut machine = LaunchStateMachine::new();
        let outcome = self.drive(&mut machine, plan);
        if outcome.is_err() {
            machine.fail();
        }
        LaunchRun {
            install_attempts: machine.install_attempts(),
            history: machine.into_history(),
            outcome,
        }
    }

    fn drive(
        &self,
        machine: &mut LaunchStateMachine,
        plan: LaunchPlan<'_>,
    ) -> StepResult<LaunchResult> {
        let destination = plan.destination;
        let id = destination.id();

        machine.transition(LaunchState::Terminating)?;
        match destination.kind() {
            DestinationKind::Simulator => Simctl::new(self.ctx).terminate(id, plan.bundle_id),
            DestinationKind::Device => Devicectl::new(self.ctx).terminate(id, plan.app_name),
        }

        self.install_with_retry(machine, destination, plan.artifact)?;

        machine.transition(LaunchState::Launching)?;
        self.ctx.check_cancelled("launch")?;
        self.progress.step(
            Step::Launch,
            &format!(
                "launching {}{}",
                plan.bundle_id,
                if plan.options.debug { " (waiting for debugger)" } else { "" }
            ),
        );

        let env = child_environment(destination.kind(), &plan.options.env);
        let output = match destination.kind() {
            DestinationKind::Simulator => {
                let out = Simctl::new(self.ctx).launch(
                    id,
                    plan.bundle_id,
                    plan.options.debug,
                    &plan.options.args,
                    &env,
                )?;
                LaunchOutput::Line(out.stdout)
            }
            DestinationKind::Device => LaunchOutput::Payload(Devicectl::new(self.ctx).launch(
                id,
                plan.bundle_id,
                plan.options.debug,
                &plan.options.args,
                &env,
            )?),
        };

        let result = output
            .into_result(plan.bundle_id, id, plan.artifact.to_path_buf())
            .map_err(|e| {
                LaunchError::state(
                    destination.describe(),
                    format!("launch reported success but {}", e),
                )
            })?;

        machine.transition(LaunchState::Launched)?;
        info!("launched {} as pid {}", result.bundle_id, result.pid);
        self.progress.step(
            Step::Launch,
            &format!("{} running as pid {}", result.bundle_id, result.pid),
        );
        Ok(result)
    }

    /// Install, retrying after a simulator reboot when the install times out.
    fn install_with_retry(
        &self,
        machine: &mut LaunchStateMachine,
        destination: &ExecutionDestination,
        artifact: &Path,
    ) -> StepResult<()> {
        let max_attempts = self.ctx.config.install.max_attempts;
        let id = destination.id();

        loop {
            machine.transition(LaunchState::Installing)?;
            self.ctx.check_cancelled("install")?;
            let attempt = machine.install_attempts();
            self.progress.step(
                Step::Install,
                &format!(
                    "installing {} on {} (attempt {})",
                    artifact.display(),
                    destination.describe(),
                    attempt
                ),
            );

            let result = match destination.kind() {
                DestinationKind::Simulator => Simctl::new(self.ctx).install(id, artifact),
                DestinationKind::Device => Devicectl::new(self.ctx).install(id, artifact),
            };

            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let retryable = err.is_timeout()
                && destination.kind() == DestinationKind::Simulator
                && attempt < max_attempts;
            if !retryable {
                return Err(err);
            }

            machine.transition(LaunchState::InstallTimedOut)?;
            warn!("install attempt {} timed out: {}", attempt, err);
            self.progress.warn(
                Step::Install,
                &format!("install timed out; rebooting {}", destination.describe()),
            );

            machine.transition(LaunchState::RestartingDestination)?;
            let simctl = Simctl::new(self.ctx);
            simctl.shutdown(id)?;
            simctl.boot(id)?;
            simctl.wait_for_boot(id)?;
        }
    }
}
