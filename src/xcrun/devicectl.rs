//! `xcrun devicectl`
//!
//! devicectl writes its structured results to the file named by
//! `--json-output`; stdout is for humans only. Each query here hands it a
//! fresh temporary file and reads the payload back.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use launch_process::CommandSpec;
use tracing::debug;

use crate::context::LaunchContext;
use crate::destination::{LockState, PairingState, PhysicalDeviceDestination, TransportKind, TunnelState};
use crate::error::{LaunchError, StepResult};

/// Connectivity as reported by `device info details`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConnectivity {
    pub name: Option<String>,
    pub pairing: PairingState,
    pub tunnel: TunnelState,
    pub transport: TransportKind,
}

impl DeviceConnectivity {
    /// Copy the freshly queried state onto `device`.
    pub fn apply_to(&self, device: &mut PhysicalDeviceDestination) {
        if let Some(ref name) = self.name {
            if device.name.is_empty() {
                device.name = name.clone();
            }
        }
        device.pairing = self.pairing;
        device.tunnel = self.tunnel;
        device.transport = self.transport;
    }
}

/// Parse the `device info details` payload.
pub fn parse_connectivity(payload: &Value) -> DeviceConnectivity {
    let result = &payload["result"];
    let connection = &result["connectionProperties"];
    let text = |v: &Value| v.as_str().unwrap_or_default().to_string();
    DeviceConnectivity {
        name: result["deviceProperties"]["name"].as_str().map(str::to_string),
        pairing: PairingState::parse(&text(&connection["pairingState"])),
        tunnel: TunnelState::parse(&text(&connection["tunnelState"])),
        transport: TransportKind::parse(&text(&connection["transportType"])),
    }
}

/// Parse the `device info lockState` payload.
///
/// Newer tools report `lockState`; older ones only `passcodeRequired`.
pub fn parse_lock_state(payload: &Value) -> LockState {
    let result = &payload["result"];
    if let Some(state) = result["lockState"].as_str() {
        return LockState::parse(state);
    }
    match result["passcodeRequired"].as_bool() {
        Some(true) => LockState::Locked,
        Some(false) => LockState::Unlocked,
        None => LockState::Unknown,
    }
}

/// Pids of running processes whose executable lives in `<app_name>.app`.
pub fn matching_processes(payload: &Value, app_name: &str) -> Vec<u32> {
    let needle = format!("/{}.app/", app_name);
    payload["result"]["runningProcesses"]
        .as_array()
        .map(|processes| {
            processes
                .iter()
                .filter(|p| {
                    p["executable"]
                        .as_str()
                        .map(|exe| exe.contains(&needle))
                        .unwrap_or(false)
                })
                .filter_map(|p| p["processIdentifier"].as_u64())
                .filter_map(|pid| u32::try_from(pid).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// devicectl bound to a run context.
pub struct Devicectl<'a> {
    ctx: &'a LaunchContext,
}

impl<'a> Devicectl<'a> {
    pub fn new(ctx: &'a LaunchContext) -> Self {
        Self { ctx }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::xcrun(["devicectl"]).args(args)
    }

    /// Run a devicectl command with `--json-output` and return the payload.
    ///
    /// `args` are inserted before `--json-output`; `trailing` after it.
    fn run_json(
        &self,
        operation: &str,
        args: &[&str],
        trailing: &[String],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> StepResult<Value> {
        let output_file = tempfile::Builder::new()
            .prefix("devicectl-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| LaunchError::io("create devicectl output file", e))?;
        let path = output_file.path().display().to_string();

        let spec = self
            .command(args.iter().copied())
            .args(["--json-output", path.as_str()])
            .args(trailing.iter().cloned())
            .envs(env.clone())
            .timeout(timeout);
        self.ctx.run_checked(operation, &spec)?;

        read_payload(output_file.path())
            .map_err(|message| LaunchError::state(format!("{} output", operation), message))
    }

    /// Pairing, tunnel and transport state of `device_id`.
    pub fn connectivity(&self, device_id: &str) -> StepResult<DeviceConnectivity> {
        let payload = self.run_json(
            "query device details",
            &["device", "info", "details", "--device", device_id],
            &[],
            &BTreeMap::new(),
            self.ctx.query_timeout(),
        )?;
        Ok(parse_connectivity(&payload))
    }

    pub fn lock_state(&self, device_id: &str) -> StepResult<LockState> {
        let payload = self.run_json(
            "query lock state",
            &["device", "info", "lockState", "--device", device_id],
            &[],
            &BTreeMap::new(),
            self.ctx.query_timeout(),
        )?;
        Ok(parse_lock_state(&payload))
    }

    /// Stop running instances of `<app_name>.app`. Best effort.
    pub fn terminate(&self, device_id: &str, app_name: &str) {
        let payload = match self.run_json(
            "list device processes",
            &["device", "info", "processes", "--device", device_id],
            &[],
            &BTreeMap::new(),
            self.ctx.query_timeout(),
        ) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("terminate previous instance (ignored): {}", e);
                return;
            }
        };

        for pid in matching_processes(&payload, app_name) {
            let pid = pid.to_string();
            let spec = self
                .command([
                    "device", "process", "terminate", "--device", device_id, "--pid", pid.as_str(),
                ])
                .timeout(self.ctx.query_timeout());
            self.ctx.run_best_effort("terminate previous instance", &spec);
        }
    }

    pub fn install(&self, device_id: &str, artifact: &Path) -> StepResult<()> {
        let spec = self
            .command(["device", "install", "app", "--device", device_id])
            .arg(artifact.display().to_string())
            .timeout(self.ctx.config.timeouts.install());
        self.ctx.run_checked("install", &spec)?;
        Ok(())
    }

    /// Launch `bundle_id` and return the structured result payload.
    ///
    /// `env` must already carry the `DEVICECTL_CHILD_` prefix.
    pub fn launch(
        &self,
        device_id: &str,
        bundle_id: &str,
        start_stopped: bool,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> StepResult<Value> {
        let mut leading = vec!["device", "process", "launch", "--device", device_id];
        if start_stopped {
            leading.push("--start-stopped");
        }
        leading.push("--terminate-existing");

        let mut trailing = vec![bundle_id.to_string()];
        trailing.extend(args.iter().cloned());

        self.run_json(
            "launch",
            &leading,
            &trailing,
            env,
            self.ctx.config.timeouts.launch(),
        )
    }
}

fn read_payload(path: &Path) -> Result<Value, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    if contents.trim().is_empty() {
        return Err(format!("{} is empty", path.display()));
    }
    serde_json::from_str(&contents).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}
