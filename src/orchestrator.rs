//! Build-launch-debug orchestration
//!
//! One sequential run per invocation:
//! Build → Gatekeeper → Locate → Prepare → Install/Launch →
//! (Debug Server → Attach, only when debugging).
//!
//! Any error stops the run; the report keeps everything gathered up to that
//! point, including the state histories of both state machines.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::attach::{attach, AttachOutcome, SessionHost};
use crate::builder::Builder;
use crate::context::LaunchContext;
use crate::debug_server::{server_log_path, DebugServerController, DebugServerState, DebugSession};
use crate::destination::ExecutionDestination;
use crate::error::{ExitCode, LaunchError, StepResult};
use crate::gatekeeper::Gatekeeper;
use crate::launch::{LaunchOptions, LaunchPlan, LaunchResult, LaunchState, Launcher};
use crate::locator::{self, BuildArtifactLocation};
use crate::prepare::{identify_bundle, prepare_bundle, AppBundle};
use crate::progress::{ProgressSink, Step};
use crate::target::BuildTarget;

/// Everything one run needs from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub target: BuildTarget,
    pub destination: ExecutionDestination,
    pub options: LaunchOptions,
    /// Debug-server port (used only when `options.debug`)
    pub port: u16,
    /// Reuse the existing build output
    pub skip_build: bool,
}

/// Structured completion signal.
#[derive(Debug)]
pub enum Completion {
    Succeeded,
    /// Launched, but something needs the operator's attention
    Warning(Vec<String>),
    Failed(LaunchError),
}

impl Completion {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Completion::Succeeded => ExitCode::Success,
            Completion::Warning(_) => ExitCode::Warning,
            Completion::Failed(e) => e.kind().exit_code(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Completion::Failed(_))
    }

    pub fn error(&self) -> Option<&LaunchError> {
        match self {
            Completion::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// What a run did and how it ended.
#[derive(Debug)]
pub struct RunReport {
    /// Destination as last queried (the request's copy if never queried)
    pub destination: ExecutionDestination,
    pub workspace_root: Option<PathBuf>,
    pub artifact: Option<BuildArtifactLocation>,
    pub bundle_id: Option<String>,
    /// Non-fatal preparation problems
    pub prepare_warnings: Vec<String>,
    pub launch: Option<LaunchResult>,
    pub launch_history: Vec<LaunchState>,
    pub install_attempts: u32,
    /// Empty when the debug server was never started
    pub debug_history: Vec<DebugServerState>,
    pub debug_session: Option<DebugSession>,
    pub attach: Option<AttachOutcome>,
    pub completion: Completion,
}

impl RunReport {
    fn new(destination: ExecutionDestination) -> Self {
        Self {
            destination,
            workspace_root: None,
            artifact: None,
            bundle_id: None,
            prepare_warnings: Vec::new(),
            launch: None,
            launch_history: Vec::new(),
            install_attempts: 0,
            debug_history: Vec::new(),
            debug_session: None,
            attach: None,
            completion: Completion::Succeeded,
        }
    }
}

pub struct Orchestrator<'a> {
    ctx: &'a LaunchContext,
    progress: &'a dyn ProgressSink,
    host: &'a dyn SessionHost,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        ctx: &'a LaunchContext,
        progress: &'a dyn ProgressSink,
        host: &'a dyn SessionHost,
    ) -> Self {
        Self {
            ctx,
            progress,
            host,
        }
    }

    pub fn run(&self, request: &RunRequest) -> RunReport {
        let mut report = RunReport::new(request.destination.clone());
        let mut notices = Vec::new();

        report.completion = match self.execute(request, &mut report, &mut notices) {
            Ok(()) if notices.is_empty() => Completion::Succeeded,
            Ok(()) => Completion::Warning(notices),
            Err(e) => {
                warn!("run failed: {}", e);
                Completion::Failed(e)
            }
        };
        report
    }

    fn execute(
        &self,
        request: &RunRequest,
        report: &mut RunReport,
        notices: &mut Vec<String>,
    ) -> StepResult<()> {
        let kind = request.destination.kind();
        let label = request
            .target
            .parsed_label()
            .map_err(|e| LaunchError::Config(e.to_string()))?;
        let root = locator::workspace_root(&request.target)?;
        report.workspace_root = Some(root.clone());

        if request.skip_build {
            self.progress.step(Step::Build, "skipped; reusing existing output");
        } else {
            self.progress
                .step(Step::Build, &format!("building {} for {}", label.canonical(), kind));
            Builder::new(self.ctx).build(&root, &label, kind, request.options.debug)?;
        }

        self.ctx.check_cancelled("destination check")?;
        self.progress.step(
            Step::Destination,
            &format!("preparing {}", request.destination.describe()),
        );
        let progress = self.progress;
        let mut on_unlock_wait = |waited: std::time::Duration| {
            progress.step(
                Step::Destination,
                &format!("device is locked; unlock it to continue ({}s)", waited.as_secs()),
            );
        };
        report.destination =
            Gatekeeper::new(self.ctx).ensure_ready(&request.destination, &mut on_unlock_wait)?;

        self.progress.step(Step::Locate, "locating build output");
        let location = locator::locate(&request.target, kind)?;
        self.progress
            .step(Step::Locate, &format!("found {}", location.artifact.display()));
        report.artifact = Some(location.clone());

        self.progress.step(Step::Prepare, "reading bundle identifier");
        let bundle = AppBundle::open(self.ctx, &location.artifact)?;
        let bundle_id = identify_bundle(self.ctx, &bundle)?;
        report.bundle_id = Some(bundle_id.clone());
        report.prepare_warnings = prepare_bundle(self.ctx, &bundle, kind);
        for w in &report.prepare_warnings {
            self.progress.warn(Step::Prepare, w);
        }

        let app_name = bundle.name();
        let run = Launcher::new(self.ctx, self.progress).install_and_launch(LaunchPlan {
            destination: &report.destination,
            artifact: &location.artifact,
            bundle_id: &bundle_id,
            app_name: &app_name,
            options: &request.options,
        });
        report.launch_history = run.history;
        report.install_attempts = run.install_attempts;
        let launch = run.outcome?;
        report.launch = Some(launch.clone());

        if !request.options.debug {
            return Ok(());
        }

        let mut controller = DebugServerController::new(self.ctx, self.progress);
        if let Some(ref root) = report.workspace_root {
            controller = controller.with_log(server_log_path(root));
        }
        let server = controller.start(&launch, kind, request.port);
        report.debug_history = server.history;
        let session = server.outcome?;
        if session.readiness.is_degraded() {
            notices.push(format!(
                "debug server on port {} was not confirmed listening",
                request.port
            ));
        }
        report.debug_session = Some(session);

        self.progress.step(Step::Attach, "starting debug session");
        let outcome = attach(self.host, &launch, kind, request.port);
        match outcome {
            AttachOutcome::Started => info!("debug session started"),
            AttachOutcome::NotStarted { ref instructions } => {
                self.progress.warn(Step::Attach, "debugger was not attached automatically");
                notices.push(instructions.clone());
            }
        }
        report.attach = Some(outcome);
        Ok(())
    }
}
