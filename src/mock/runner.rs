//! Scripted `ToolRunner`

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use launch_process::{
    CancelToken, CapturedOutput, CommandSpec, ExitInfo, SpawnedProcess, ToolError, ToolOutput,
    ToolResult, ToolRunner,
};

use super::failure::{ProcessScript, Response};

/// Reported for a scripted timeout when the command sets none.
const DEFAULT_SCRIPTED_TIMEOUT: Duration = Duration::from_secs(120);

/// First pid handed out to spawned processes.
const FIRST_SPAWNED_PID: u32 = 70_000;

/// Command tokens matched in order (not necessarily adjacent) against
/// `program args…`.
fn matches(pattern: &[String], spec: &CommandSpec) -> bool {
    let mut tokens = std::iter::once(&spec.program).chain(spec.args.iter());
    pattern.iter().all(|want| tokens.any(|t| t == want))
}

struct Rule {
    pattern: Vec<String>,
    /// The last response repeats once the queue is down to one
    responses: VecDeque<Response>,
}

struct SpawnRule {
    pattern: Vec<String>,
    script: ProcessScript,
}

#[derive(Default)]
struct Inner {
    rules: Vec<Rule>,
    spawn_rules: Vec<SpawnRule>,
    calls: Vec<CommandSpec>,
    spawned: Vec<CommandSpec>,
    dead_pids: HashSet<u32>,
    killed: Vec<u32>,
    next_pid: u32,
}

/// A `ToolRunner` that answers from scripted rules and records every call.
///
/// Rules are checked in the order added; the first match wins. Commands
/// that match no rule exit 0 with empty output. All pids are alive unless
/// marked dead.
#[derive(Default)]
pub struct ScriptedRunner {
    inner: Mutex<Inner>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer commands matching `pattern` with `responses` in turn.
    pub fn on(&self, pattern: &[&str], responses: Vec<Response>) -> &Self {
        self.lock().rules.push(Rule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            responses: responses.into(),
        });
        self
    }

    /// Shorthand for a single repeating response.
    pub fn respond(&self, pattern: &[&str], response: Response) -> &Self {
        self.on(pattern, vec![response])
    }

    /// Script background processes spawned from matching commands.
    pub fn on_spawn(&self, pattern: &[&str], script: ProcessScript) -> &Self {
        self.lock().spawn_rules.push(SpawnRule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            script,
        });
        self
    }

    /// Make `is_alive(pid)` report false.
    pub fn mark_dead(&self, pid: u32) -> &Self {
        self.lock().dead_pids.insert(pid);
        self
    }

    /// Every `run` call, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock().calls.clone()
    }

    /// Rendered command lines of every `run` call.
    pub fn command_lines(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|c| std::iter::once(c.program.clone()).chain(c.args.iter().cloned()).collect::<Vec<_>>().join(" "))
            .collect()
    }

    /// `run` calls matching `pattern`.
    pub fn calls_matching(&self, pattern: &[&str]) -> Vec<CommandSpec> {
        let pattern: Vec<String> = pattern.iter().map(|s| s.to_string()).collect();
        self.lock()
            .calls
            .iter()
            .filter(|c| matches(&pattern, c))
            .cloned()
            .collect()
    }

    pub fn count(&self, pattern: &[&str]) -> usize {
        self.calls_matching(pattern).len()
    }

    /// Every `spawn` call, in order.
    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.lock().spawned.clone()
    }

    /// Pids passed to `kill`.
    pub fn killed(&self) -> Vec<u32> {
        self.lock().killed.clone()
    }

    fn next_response(&self, spec: &CommandSpec) -> Response {
        let mut inner = self.lock();
        inner.calls.push(spec.clone());
        let rule = inner
            .rules
            .iter_mut()
            .find(|rule| matches(&rule.pattern, spec));
        match rule {
            Some(rule) if rule.responses.len() > 1 => {
                rule.responses.pop_front().unwrap_or_else(Response::ok)
            }
            Some(rule) => rule.responses.front().cloned().unwrap_or_else(Response::ok),
            None => Response::ok(),
        }
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec, cancel: &CancelToken) -> ToolResult<ToolOutput> {
        let command = spec.display();
        let response = self.next_response(spec);

        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled { command });
        }
        if let Some(delay) = response.delay {
            if !cancel.sleep(delay) {
                return Err(ToolError::Cancelled { command });
            }
        }
        if response.timeout {
            return Err(ToolError::TimedOut {
                command,
                timeout: spec.timeout.unwrap_or(DEFAULT_SCRIPTED_TIMEOUT),
                stdout: response.stdout,
                stderr: response.stderr,
            });
        }
        if let Some(ref payload) = response.json_output {
            if let Some(path) = spec.arg_after("--json-output") {
                let json = serde_json::to_string(payload)
                    .map_err(|e| ToolError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
                fs::write(path, json)?;
            }
        }

        Ok(ToolOutput {
            command,
            exit: ExitInfo::code(response.exit_code),
            stdout: response.stdout,
            stderr: response.stderr,
        })
    }

    fn spawn(&self, spec: &CommandSpec) -> ToolResult<Box<dyn SpawnedProcess>> {
        let mut inner = self.lock();
        inner.spawned.push(spec.clone());
        let script = inner
            .spawn_rules
            .iter()
            .find(|rule| matches(&rule.pattern, spec))
            .map(|rule| rule.script.clone())
            .unwrap_or(ProcessScript::RunForever);
        if let Some(ref log) = spec.output_log {
            if let Some(dir) = log.parent() {
                fs::create_dir_all(dir)?;
            }
            let text = match script {
                ProcessScript::ExitAfter {
                    ref stdout,
                    ref stderr,
                    ..
                } => format!("{}{}", stdout, stderr),
                ProcessScript::RunForever => String::new(),
            };
            fs::write(log, text)?;
        }
        let pid = FIRST_SPAWNED_PID + inner.next_pid;
        inner.next_pid += 1;
        Ok(Box::new(ScriptedProcess {
            pid,
            script,
            polls: 0,
            killed: false,
        }))
    }

    fn is_alive(&self, pid: u32) -> bool {
        !self.lock().dead_pids.contains(&pid)
    }

    fn kill(&self, pid: u32) -> io::Result<()> {
        self.lock().killed.push(pid);
        Ok(())
    }
}

/// A background process driven by a [`ProcessScript`].
#[derive(Debug)]
pub struct ScriptedProcess {
    pid: u32,
    script: ProcessScript,
    polls: u32,
    killed: bool,
}

impl SpawnedProcess for ScriptedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitInfo>> {
        if self.killed {
            return Ok(Some(ExitInfo {
                code: None,
                signal: Some(9),
            }));
        }
        self.polls += 1;
        match self.script {
            ProcessScript::ExitAfter { polls, code, .. } if self.polls >= polls => {
                Ok(Some(ExitInfo::code(code)))
            }
            _ => Ok(None),
        }
    }

    fn captured(&self) -> CapturedOutput {
        match &self.script {
            ProcessScript::ExitAfter { stdout, stderr, .. } => CapturedOutput {
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            },
            ProcessScript::RunForever => CapturedOutput::default(),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        self.killed = true;
        Ok(())
    }
}
