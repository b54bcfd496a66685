//! Tool runner trait and the system implementation

use std::fs::{self, File};
use std::io;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::command::CommandSpec;
use crate::error::{ToolError, ToolResult};
use crate::process::{is_process_alive, kill_process};
use crate::spawned::{ExitInfo, SharedBuffer, SpawnedProcess, SystemProcess};

/// Captured result of a completed tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Rendered command line
    pub command: String,
    /// How the process ended
    pub exit: ExitInfo,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// True for exit code 0.
    pub fn success(&self) -> bool {
        self.exit.success()
    }

    /// Convert a non-zero exit into `ToolError::Failed`.
    pub fn check(self) -> ToolResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                command: self.command,
                code: self.exit.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Everything the orchestrator needs from the operating system.
///
/// Object safe so the orchestrator can hold an `Arc<dyn ToolRunner>` and
/// tests can substitute a scripted implementation.
pub trait ToolRunner: Send + Sync {
    /// Run to completion, honouring `spec.timeout` and `cancel`.
    ///
    /// Any exit status is returned as `Ok`; only spawn failures, timeouts and
    /// cancellation are errors.
    fn run(&self, spec: &CommandSpec, cancel: &CancelToken) -> ToolResult<ToolOutput>;

    /// Start in the background with output accumulated into buffers.
    fn spawn(&self, spec: &CommandSpec) -> ToolResult<Box<dyn SpawnedProcess>>;

    /// Whether `pid` is a live process.
    fn is_alive(&self, pid: u32) -> bool;

    /// Forcefully kill `pid`.
    fn kill(&self, pid: u32) -> io::Result<()>;

    /// Like `run`, but a non-zero exit is `ToolError::Failed`.
    fn run_checked(&self, spec: &CommandSpec, cancel: &CancelToken) -> ToolResult<ToolOutput> {
        self.run(spec, cancel)?.check()
    }
}

/// Runner backed by real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Time between SIGTERM and SIGKILL when stopping a timed-out child
    pub termination_grace: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            termination_grace: Duration::from_secs(2),
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate a child gracefully, then forcefully.
    fn terminate_child(&self, child: &mut Child) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(child.id()) {
                let _ = signal::kill(Pid::from_raw(raw), Signal::SIGTERM);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.kill();
        }

        let start = Instant::now();
        while start.elapsed() < self.termination_grace {
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(crate::POLL_INTERVAL_MS));
        }

        let _ = child.kill();
        child.wait()?;
        Ok(())
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, cancel: &CancelToken) -> ToolResult<ToolOutput> {
        let command_line = spec.display();
        debug!("running: {}", command_line);

        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled {
                command: command_line,
            });
        }

        let mut child = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let stdout_handle = stdout.pump(child.stdout.take());
        let stderr_handle = stderr.pump(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            if cancel.is_cancelled() {
                self.terminate_child(&mut child)?;
                return Err(ToolError::Cancelled {
                    command: command_line,
                });
            }

            if let Some(timeout) = spec.timeout {
                if started.elapsed() >= timeout {
                    warn!("{} timed out after {:?}, terminating", command_line, timeout);
                    self.terminate_child(&mut child)?;
                    // Readers are left detached: a grandchild may still hold the pipes.
                    return Err(ToolError::TimedOut {
                        command: command_line,
                        timeout,
                        stdout: stdout.snapshot(),
                        stderr: stderr.snapshot(),
                    });
                }
            }

            match child.try_wait()? {
                Some(status) => break status,
                None => std::thread::sleep(Duration::from_millis(crate::POLL_INTERVAL_MS)),
            }
        };

        let _ = stdout_handle.join();
        let _ = stderr_handle.join();

        let output = ToolOutput {
            command: command_line,
            exit: ExitInfo::from_status(status),
            stdout: stdout.snapshot(),
            stderr: stderr.snapshot(),
        };
        debug!("{} finished with {}", output.command, output.exit);
        Ok(output)
    }

    fn spawn(&self, spec: &CommandSpec) -> ToolResult<Box<dyn SpawnedProcess>> {
        debug!("spawning: {}", spec.display());
        let mut command = spec.to_command();
        command.stdin(Stdio::null());

        let log = match spec.output_log {
            Some(ref path) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let file = File::create(path)?;
                command
                    .stdout(Stdio::from(file.try_clone()?))
                    .stderr(Stdio::from(file));
                Some(path.clone())
            }
            None => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
                None
            }
        };

        let child = command.spawn().map_err(|source| ToolError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        Ok(Box::new(match log {
            Some(path) => SystemProcess::logging_to(child, path),
            None => SystemProcess::new(child),
        }))
    }

    fn is_alive(&self, pid: u32) -> bool {
        is_process_alive(pid)
    }

    fn kill(&self, pid: u32) -> io::Result<()> {
        kill_process(pid)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script])
    }

    #[test]
    fn test_run_captures_output() {
        let runner = SystemRunner::new();
        let output = runner
            .run(&sh("echo out; echo err >&2"), &CancelToken::new())
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn test_nonzero_exit_is_ok_until_checked() {
        let runner = SystemRunner::new();
        let output = runner.run(&sh("exit 3"), &CancelToken::new()).unwrap();
        assert_eq!(output.exit.code, Some(3));

        let err = runner
            .run_checked(&sh("echo nope >&2; exit 3"), &CancelToken::new())
            .unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "nope\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_env_and_cwd_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        let spec = sh("echo $LAUNCH_TEST_VAR; pwd")
            .env("LAUNCH_TEST_VAR", "hello")
            .cwd(dir.path());
        let output = runner.run(&spec, &CancelToken::new()).unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let pwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_timeout_terminates_child() {
        let runner = SystemRunner {
            termination_grace: Duration::from_millis(200),
        };
        let spec = sh("exec sleep 30").timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = runner.run(&spec, &CancelToken::new()).unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_cancel_stops_run() {
        let runner = SystemRunner {
            termination_grace: Duration::from_millis(200),
        };
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let err = runner.run(&sh("exec sleep 30"), &cancel).unwrap_err();
        assert!(err.is_cancelled());
        canceller.join().unwrap();
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run(
                &CommandSpec::new("definitely-not-a-real-tool-xyz"),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn test_spawned_process_exit_and_output() {
        let runner = SystemRunner::new();
        let mut process = runner.spawn(&sh("echo ready; exit 7")).unwrap();
        let exit = loop {
            if let Some(exit) = process.try_wait().unwrap() {
                break exit;
            }
            std::thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(exit.code, Some(7));
        assert_eq!(process.captured().stdout, "ready\n");
    }

    #[test]
    fn test_logged_child_keeps_writing_after_handle_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("state/server.log");
        let spec = sh("echo started; sleep 0.3; echo late; echo late-err >&2")
            .output_log(&log);

        {
            let runner = SystemRunner::new();
            let process = runner.spawn(&spec).unwrap();
            assert!(runner.is_alive(process.pid()));
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let contents = loop {
            let contents = std::fs::read_to_string(&log).unwrap_or_default();
            if contents.contains("late-err") || Instant::now() >= deadline {
                break contents;
            }
            std::thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(contents, "started\nlate\nlate-err\n");
    }

    #[test]
    fn test_logged_child_output_is_captured_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("server.log");
        std::fs::write(&log, "previous run\n").unwrap();
        let runner = SystemRunner::new();
        let mut process = runner
            .spawn(&sh("echo attaching; echo 'failed to attach' >&2; exit 1").output_log(&log))
            .unwrap();
        let exit = loop {
            if let Some(exit) = process.try_wait().unwrap() {
                break exit;
            }
            std::thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(exit.code, Some(1));
        let captured = process.captured();
        assert_eq!(captured.stdout, "attaching\nfailed to attach\n");
        assert!(captured.stderr.is_empty());
    }

    #[test]
    fn test_spawned_process_kill() {
        let runner = SystemRunner::new();
        let mut process = runner.spawn(&sh("exec sleep 30")).unwrap();
        assert!(runner.is_alive(process.pid()));
        process.kill().unwrap();
        assert!(process.try_wait().unwrap().is_some());
    }
}
