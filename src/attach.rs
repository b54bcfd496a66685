//! Session Attacher
//!
//! Builds an LLDB attach request for the launched process and hands it to a
//! [`SessionHost`]. A host that cannot start a session is not a failure: the
//! app is already running and paused, so the operator gets instructions to
//! attach by hand.

use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{info, warn};

use crate::destination::DestinationKind;
use crate::launch::LaunchResult;

/// LLDB attach request in the shape debugger front-ends accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub request: String,
    pub name: String,
    pub pid: u32,
    /// Debug port of the run. Simulator attaches connect to it; device
    /// attaches go through the devicectl tunnel, so it is recorded only.
    pub port: u16,
    pub attach_commands: Vec<String>,
}

impl AttachConfiguration {
    pub fn new(launch: &LaunchResult, destination: DestinationKind, port: u16) -> Self {
        let attach_commands = match destination {
            DestinationKind::Simulator => {
                vec![format!("process connect connect://127.0.0.1:{}", port)]
            }
            DestinationKind::Device => vec![
                format!("device select {}", launch.destination_id),
                format!("device process attach --pid {}", launch.pid),
            ],
        };
        Self {
            kind: "lldb".to_string(),
            request: "attach".to_string(),
            name: format!(
                "Attach to {} ({}, port {})",
                launch.bundle_id, destination, port
            ),
            pid: launch.pid,
            port,
            attach_commands,
        }
    }

    /// lldb command-line arguments replaying the attach commands.
    pub fn lldb_args(&self) -> Vec<String> {
        self.attach_commands
            .iter()
            .flat_map(|c| ["-o".to_string(), c.clone()])
            .collect()
    }
}

/// Whether a debug session was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttachOutcome {
    Started,
    NotStarted { instructions: String },
}

impl AttachOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, AttachOutcome::Started)
    }
}

/// Something that can run a debug session.
pub trait SessionHost {
    fn start_session(&self, config: &AttachConfiguration) -> AttachOutcome;
}

/// Operator instructions for attaching by hand.
pub fn manual_instructions(config: &AttachConfiguration) -> String {
    let mut text = String::from("attach manually with:\n  lldb");
    for command in &config.attach_commands {
        text.push_str(&format!(" -o '{}'", command));
    }
    if let Ok(json) = serde_json::to_string_pretty(config) {
        text.push_str("\nor use this debugger configuration:\n");
        text.push_str(&json);
    }
    text
}

/// Reports the configuration and leaves attaching to the operator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualSessionHost;

impl SessionHost for ManualSessionHost {
    fn start_session(&self, config: &AttachConfiguration) -> AttachOutcome {
        AttachOutcome::NotStarted {
            instructions: manual_instructions(config),
        }
    }
}

/// Runs an interactive `lldb` on the caller's terminal.
#[derive(Debug, Clone)]
pub struct LldbSessionHost {
    pub program: String,
}

impl Default for LldbSessionHost {
    fn default() -> Self {
        Self {
            program: "lldb".to_string(),
        }
    }
}

impl SessionHost for LldbSessionHost {
    fn start_session(&self, config: &AttachConfiguration) -> AttachOutcome {
        let mut command = Command::new(&self.program);
        command.args(config.lldb_args());
        match command.spawn() {
            Ok(mut child) => {
                info!("lldb started (pid {})", child.id());
                if let Err(e) = child.wait() {
                    warn!("waiting for lldb: {}", e);
                }
                AttachOutcome::Started
            }
            Err(e) => {
                warn!("could not start {}: {}", self.program, e);
                AttachOutcome::NotStarted {
                    instructions: manual_instructions(config),
                }
            }
        }
    }
}

/// `attach(port, kind)`.
pub fn attach(
    host: &dyn SessionHost,
    launch: &LaunchResult,
    destination: DestinationKind,
    port: u16,
) -> AttachOutcome {
    let config = AttachConfiguration::new(launch, destination, port);
    host.start_session(&config)
}
