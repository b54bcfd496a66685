//! Debug Server Controller
//!
//! Simulator: clear the port, check the app is still alive, spawn
//! `debugserver localhost:<port> --attach=<pid>` and wait for it to listen.
//! Device: lldb attaches through the device tunnel, so only a short settle
//! delay is inserted.

mod state;

pub use state::{DebugServerState, DebugServerStateMachine};

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use launch_process::{CancelToken, CommandSpec, SpawnedProcess, ToolError, ToolRunner};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ReadinessMode;
use crate::context::LaunchContext;
use crate::destination::DestinationKind;
use crate::error::{LaunchError, StepResult};
use crate::launch::LaunchResult;
use crate::progress::{ProgressSink, Step};
use crate::record::STATE_DIR;

/// debugserver inside the active Xcode, relative to `xcode-select -p`.
const DEBUGSERVER_IN_XCODE: &str =
    "../SharedFrameworks/LLDB.framework/Versions/A/Resources/debugserver";

/// debugserver output, rewritten on every debug run.
pub const SERVER_LOG_FILE: &str = "debugserver.log";

/// `<workspace>/.ios-launch/debugserver.log`
pub fn server_log_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(STATE_DIR).join(SERVER_LOG_FILE)
}

/// How readiness was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// The port was observed listening
    Listening,
    /// Settle interval elapsed with the server still running
    Settled,
    /// Poll timeout reached with the server still running; not confirmed
    Assumed,
    /// Device: attach happens remotely
    Remote,
}

impl Readiness {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Readiness::Assumed)
    }
}

/// A debug server ready for an attach.
pub struct DebugSession {
    pub port: u16,
    pub kind: DestinationKind,
    pub readiness: Readiness,
    /// The spawned debugserver (simulator only)
    pub process: Option<Box<dyn SpawnedProcess>>,
}

impl std::fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("port", &self.port)
            .field("kind", &self.kind)
            .field("readiness", &self.readiness)
            .field("pid", &self.process.as_ref().map(|p| p.pid()))
            .finish()
    }
}

/// Outcome of a start, with the states visited.
#[derive(Debug)]
pub struct DebugServerRun {
    pub history: Vec<DebugServerState>,
    pub outcome: StepResult<DebugSession>,
}

pub struct DebugServerController<'a> {
    ctx: &'a LaunchContext,
    progress: &'a dyn ProgressSink,
    log: Option<PathBuf>,
}

impl<'a> DebugServerController<'a> {
    pub fn new(ctx: &'a LaunchContext, progress: &'a dyn ProgressSink) -> Self {
        Self {
            ctx,
            progress,
            log: None,
        }
    }

    /// Write the spawned debugserver's output to `path` instead of pipes.
    ///
    /// Without a log file the server loses its output once this process
    /// exits, and the next write can kill it with SIGPIPE.
    pub fn with_log(mut self, path: PathBuf) -> Self {
        self.log = Some(path);
        self
    }

    /// Bring up a debug server for `launch` on `port`.
    pub fn start(&self, launch: &LaunchResult, kind: DestinationKind, port: u16) -> DebugServerRun {
        let mut machine = DebugServerStateMachine::new();
        let outcome = match kind {
            DestinationKind::Simulator => self.start_local(&mut machine, launch, port),
            DestinationKind::Device => self.start_remote(&mut machine, port),
        };
        if outcome.is_err() {
            machine.fail();
        }
        DebugServerRun {
            history: machine.into_history(),
            outcome,
        }
    }

    fn start_remote(
        &self,
        machine: &mut DebugServerStateMachine,
        port: u16,
    ) -> StepResult<DebugSession> {
        machine.transition(DebugServerState::Starting)?;
        self.progress
            .step(Step::DebugServer, "device attach is remote; waiting for the app to settle");
        self.ctx
            .sleep(self.ctx.config.intervals.device_settle(), "device settle delay")?;
        machine.transition(DebugServerState::WaitingForReady)?;
        machine.transition(DebugServerState::Ready)?;
        Ok(DebugSession {
            port,
            kind: DestinationKind::Device,
            readiness: Readiness::Remote,
            process: None,
        })
    }

    fn start_local(
        &self,
        machine: &mut DebugServerStateMachine,
        launch: &LaunchResult,
        port: u16,
    ) -> StepResult<DebugSession> {
        machine.transition(DebugServerState::CleaningUp)?;
        self.progress
            .step(Step::DebugServer, &format!("clearing stale debug servers on port {}", port));
        self.cleanup(port)?;

        machine.transition(DebugServerState::Starting)?;
        if !self.ctx.runner.is_alive(launch.pid) {
            return Err(LaunchError::state(
                format!("process {}", launch.pid),
                format!(
                    "{} exited before the debugger could attach (crashed at launch?)",
                    launch.bundle_id
                ),
            ));
        }

        let server = self.server_path()?;
        let mut spec = CommandSpec::new(server.display().to_string())
            .arg(format!("localhost:{}", port))
            .arg(format!("--attach={}", launch.pid));
        if let Some(ref log) = self.log {
            debug!("debugserver output goes to {}", log.display());
            spec = spec.output_log(log);
        }
        let command_line = spec.display();
        self.progress.step(
            Step::DebugServer,
            &format!("starting debugserver on port {} for pid {}", port, launch.pid),
        );
        let mut process = self
            .ctx
            .runner
            .spawn(&spec)
            .map_err(|e| LaunchError::from_tool("start debug server", e))?;

        machine.transition(DebugServerState::WaitingForReady)?;
        let readiness = match self.wait_for_ready(process.as_mut(), port, &command_line) {
            Ok(readiness) => readiness,
            Err(e) => {
                let _ = process.kill();
                return Err(e);
            }
        };
        machine.transition(DebugServerState::Ready)?;

        match readiness {
            Readiness::Assumed => {
                warn!("debugserver never reported a listening port; assuming ready");
                self.progress.warn(
                    Step::DebugServer,
                    &format!("port {} not confirmed listening; continuing anyway", port),
                );
            }
            _ => info!("debugserver ready on port {} ({:?})", port, readiness),
        }

        Ok(DebugSession {
            port,
            kind: DestinationKind::Simulator,
            readiness,
            process: Some(process),
        })
    }

    /// Kill stale occupants of `port` and stray debugservers, bounded by
    /// `timeouts.cleanup_seconds`. Never fails except on cancellation.
    fn cleanup(&self, port: u16) -> StepResult<()> {
        let bound = self.ctx.config.timeouts.cleanup();
        let runner = Arc::clone(&self.ctx.runner);
        let cleanup_cancel = CancelToken::new();
        let token = cleanup_cancel.clone();
        let (done_tx, done_rx) = mpsc::channel();

        std::thread::spawn(move || {
            kill_stale_servers(runner.as_ref(), port, bound, &token);
            let _ = done_tx.send(());
        });

        let started = Instant::now();
        let slice = Duration::from_millis(launch_process::POLL_INTERVAL_MS);
        loop {
            if self.ctx.cancel.is_cancelled() {
                cleanup_cancel.cancel();
                return Err(LaunchError::Cancelled {
                    during: "debug server cleanup".to_string(),
                });
            }
            match done_rx.recv_timeout(slice) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if started.elapsed() >= bound {
                        warn!("debug server cleanup still running after {:?}; continuing", bound);
                        cleanup_cancel.cancel();
                        return Ok(());
                    }
                }
            }
        }
    }

    fn wait_for_ready(
        &self,
        process: &mut dyn SpawnedProcess,
        port: u16,
        command_line: &str,
    ) -> StepResult<Readiness> {
        let intervals = &self.ctx.config.intervals;
        let (mode, bound, interval) = match self.ctx.config.debug.readiness {
            ReadinessMode::Poll => (
                ReadinessMode::Poll,
                self.ctx.config.timeouts.debug_server_ready(),
                intervals.debug_server_poll(),
            ),
            ReadinessMode::Settle => (
                ReadinessMode::Settle,
                intervals.debug_server_settle(),
                Duration::from_millis(launch_process::POLL_INTERVAL_MS),
            ),
        };

        let started = Instant::now();
        loop {
            self.ctx.check_cancelled("waiting for debug server")?;

            let exit = process
                .try_wait()
                .map_err(|e| LaunchError::io("poll debugserver", e))?;
            if let Some(exit) = exit {
                let captured = process.captured();
                return Err(LaunchError::ToolInvocation {
                    operation: "start debug server".to_string(),
                    source: ToolError::Failed {
                        command: command_line.to_string(),
                        code: exit.code,
                        stdout: captured.stdout,
                        stderr: captured.stderr,
                    },
                });
            }

            if mode == ReadinessMode::Poll && self.port_listening(port) {
                return Ok(Readiness::Listening);
            }

            if started.elapsed() >= bound {
                return Ok(match mode {
                    ReadinessMode::Poll => Readiness::Assumed,
                    ReadinessMode::Settle => Readiness::Settled,
                });
            }

            self.ctx.sleep(interval, "waiting for debug server")?;
        }
    }

    fn port_listening(&self, port: u16) -> bool {
        let filter = format!("-iTCP:{}", port);
        let spec = CommandSpec::new("lsof")
            .args(["-nP", filter.as_str(), "-sTCP:LISTEN", "-t"])
            .timeout(self.ctx.config.intervals.debug_server_poll().max(Duration::from_secs(2)));
        match self.ctx.runner.run(&spec, &self.ctx.cancel) {
            Ok(output) => output.success() && !output.stdout.trim().is_empty(),
            Err(e) => {
                debug!("port probe failed: {}", e);
                false
            }
        }
    }

    /// Configured debugserver, or the one shipped with the active Xcode.
    fn server_path(&self) -> StepResult<PathBuf> {
        if let Some(ref path) = self.ctx.config.debug.server_path {
            return Ok(path.clone());
        }
        let spec = CommandSpec::new("xcode-select")
            .arg("-p")
            .timeout(self.ctx.query_timeout());
        let output = self.ctx.run_checked("locate Xcode", &spec)?;
        let developer_dir = PathBuf::from(output.stdout.trim());
        let candidate = developer_dir.join(DEBUGSERVER_IN_XCODE);
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(LaunchError::not_found("debugserver", vec![candidate]))
        }
    }
}

/// Kill whatever holds `port`, then any debugserver still running.
fn kill_stale_servers(runner: &dyn ToolRunner, port: u16, bound: Duration, cancel: &CancelToken) {
    let occupants = CommandSpec::new("lsof")
        .args(["-t".to_string(), format!("-iTCP:{}", port)])
        .timeout(bound);
    match runner.run(&occupants, cancel) {
        Ok(output) => {
            let own = std::process::id();
            for pid in output
                .stdout
                .lines()
                .filter_map(|l| l.trim().parse::<u32>().ok())
                .filter(|pid| *pid != own)
            {
                if cancel.is_cancelled() {
                    debug!("cleanup bound passed; leaving {} alone", pid);
                    return;
                }
                match runner.kill(pid) {
                    Ok(()) => info!("killed stale port {} occupant {}", port, pid),
                    Err(e) => debug!("kill {} (ignored): {}", pid, e),
                }
            }
        }
        Err(e) => debug!("port occupant lookup (ignored): {}", e),
    }

    if cancel.is_cancelled() {
        return;
    }
    let pkill = CommandSpec::new("pkill")
        .args(["-x", "debugserver"])
        .timeout(bound);
    if let Err(e) = runner.run(&pkill, cancel) {
        debug!("pkill debugserver (ignored): {}", e);
    }
}
