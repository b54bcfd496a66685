//! `xcrun simctl`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use launch_process::{CommandSpec, ToolOutput};
use tracing::{debug, info};

use crate::context::LaunchContext;
use crate::destination::{BootState, SimulatedDestination};
use crate::error::{LaunchError, StepResult};

/// simctl reports this when the device is already in the requested state.
const ALREADY_BOOTED: &str = "current state: Booted";
const ALREADY_SHUTDOWN: &str = "current state: Shutdown";

#[derive(Debug, Clone, Deserialize)]
struct SimctlDevice {
    name: String,
    udid: String,
    #[serde(default)]
    state: String,
    #[serde(default = "default_available", rename = "isAvailable")]
    is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct SimctlDevices {
    devices: BTreeMap<String, Vec<SimctlDevice>>,
}

/// Parse `simctl list devices --json`, skipping unavailable devices.
pub fn parse_devices(json: &str) -> Result<Vec<SimulatedDestination>, serde_json::Error> {
    let parsed: SimctlDevices = serde_json::from_str(json)?;
    Ok(parsed
        .devices
        .into_values()
        .flatten()
        .filter(|d| d.is_available)
        .map(|d| SimulatedDestination {
            id: d.udid,
            name: d.name,
            boot_state: BootState::parse(&d.state),
        })
        .collect())
}

/// simctl bound to a run context.
pub struct Simctl<'a> {
    ctx: &'a LaunchContext,
}

impl<'a> Simctl<'a> {
    pub fn new(ctx: &'a LaunchContext) -> Self {
        Self { ctx }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::xcrun(["simctl"]).args(args)
    }

    /// All available simulators with their boot state.
    pub fn list_devices(&self) -> StepResult<Vec<SimulatedDestination>> {
        let spec = self
            .command(["list", "devices", "--json"])
            .timeout(self.ctx.query_timeout());
        let output = self.ctx.run_checked("list simulators", &spec)?;
        parse_devices(&output.stdout).map_err(|e| {
            LaunchError::state(
                "simulators",
                format!("cannot parse `simctl list devices --json`: {}", e),
            )
        })
    }

    pub fn shutdown(&self, udid: &str) -> StepResult<()> {
        info!("shutting down simulator {}", udid);
        let spec = self
            .command(["shutdown", udid])
            .timeout(self.ctx.config.timeouts.boot());
        let output = self.ctx.run("shutdown simulator", &spec)?;
        tolerate_state(output, ALREADY_SHUTDOWN, "shutdown simulator")
    }

    pub fn boot(&self, udid: &str) -> StepResult<()> {
        info!("booting simulator {}", udid);
        let spec = self
            .command(["boot", udid])
            .timeout(self.ctx.config.timeouts.boot());
        let output = self.ctx.run("boot simulator", &spec)?;
        tolerate_state(output, ALREADY_BOOTED, "boot simulator")
    }

    /// Block until the simulator has finished booting.
    pub fn wait_for_boot(&self, udid: &str) -> StepResult<()> {
        let spec = self
            .command(["bootstatus", udid, "-b"])
            .timeout(self.ctx.config.timeouts.boot());
        self.ctx.run_checked("wait for simulator boot", &spec)?;
        Ok(())
    }

    /// Bring Simulator.app to the foreground on `udid`. Best effort.
    pub fn open_simulator_app(&self, udid: &str) {
        let spec = CommandSpec::new("open")
            .args(["-a", "Simulator", "--args", "-CurrentDeviceUDID", udid])
            .timeout(self.ctx.query_timeout());
        self.ctx.run_best_effort("open Simulator.app", &spec);
    }

    /// Stop a running instance of `bundle_id`. Best effort.
    pub fn terminate(&self, udid: &str, bundle_id: &str) {
        let spec = self
            .command(["terminate", udid, bundle_id])
            .timeout(self.ctx.query_timeout());
        self.ctx.run_best_effort("terminate previous instance", &spec);
    }

    pub fn install(&self, udid: &str, app: &Path) -> StepResult<()> {
        let spec = self
            .command(["install", udid])
            .arg(app.display().to_string())
            .timeout(self.ctx.config.timeouts.install());
        self.ctx.run_checked("install", &spec)?;
        Ok(())
    }

    /// Launch `bundle_id`; `env` must already carry the `SIMCTL_CHILD_` prefix.
    pub fn launch(
        &self,
        udid: &str,
        bundle_id: &str,
        wait_for_debugger: bool,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> StepResult<ToolOutput> {
        let mut spec = self.command(["launch"]);
        if wait_for_debugger {
            spec = spec.arg("--wait-for-debugger");
        }
        let spec = spec
            .args(["--terminate-running-process", udid, bundle_id])
            .args(args.iter().cloned())
            .envs(env.clone())
            .timeout(self.ctx.config.timeouts.launch());
        self.ctx.run_checked("launch", &spec)
    }
}

fn tolerate_state(output: ToolOutput, marker: &str, operation: &str) -> StepResult<()> {
    if output.success() {
        return Ok(());
    }
    if output.stderr.contains(marker) {
        debug!("{}: already in requested state", operation);
        return Ok(());
    }
    output
        .check()
        .map(|_| ())
        .map_err(|e| LaunchError::from_tool(operation, e))
}
