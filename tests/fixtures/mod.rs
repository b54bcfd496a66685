//! Test fixtures shared by the integration suites
//!
//! - A throwaway Bazel workspace (`MODULE.bazel`, `Apps/Demo`, `bazel-bin`)
//! - Scripted simulator and device toolchains on top of `ScriptedRunner`
//! - A session host that always attaches

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ios_launch::attach::{AttachConfiguration, AttachOutcome, SessionHost};
use ios_launch::config::LaunchConfig;
use ios_launch::mock::{Response, ScriptedRunner};
use ios_launch::{BuildTarget, ExecutionDestination, LaunchContext, LaunchOptions, RunRequest};
use launch_process::CancelToken;
use serde_json::json;
use tempfile::TempDir;

pub const LABEL: &str = "//Apps/Demo:Demo";
pub const BUNDLE_ID: &str = "com.example.Demo";
pub const SIM_ID: &str = "5A1B2C3D-0000-4000-8000-00000000AAAA";
pub const OTHER_SIM_ID: &str = "5A1B2C3D-0000-4000-8000-00000000BBBB";
pub const DEVICE_ID: &str = "00008110-000A1B2C3D4E801E";
pub const APP_PID: u32 = 4821;
pub const DEVICE_APP_PID: u32 = 3104;
pub const STALE_DEVICE_PID: u32 = 900;
pub const DEBUGSERVER: &str = "/opt/xcode/debugserver";

/// A fake Bazel workspace on disk.
pub struct Workspace {
    pub dir: TempDir,
    /// Package directory of the target
    pub package: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("MODULE.bazel"), "module(name = \"demo\")\n").unwrap();
        let package = dir.path().join("Apps/Demo");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("BUILD.bazel"), "ios_application(name = \"Demo\")\n").unwrap();
        Self { dir, package }
    }

    /// Workspace with a built `Demo.app` in `bazel-bin`.
    pub fn with_app() -> Self {
        let ws = Self::new();
        let app = ws.output_dir().join("Demo.app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("Info.plist"), "<plist/>").unwrap();
        fs::write(app.join("Demo"), "binary").unwrap();
        ws
    }

    /// Canonical workspace root, as the locator reports it.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).unwrap()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("bazel-bin/Apps/Demo")
    }

    pub fn app_path(&self) -> PathBuf {
        self.root().join("bazel-bin/Apps/Demo/Demo.app")
    }

    pub fn target(&self) -> BuildTarget {
        BuildTarget::application(LABEL, &self.package).unwrap()
    }

    pub fn request(&self, destination: ExecutionDestination, debug: bool) -> RunRequest {
        RunRequest {
            target: self.target(),
            destination,
            options: LaunchOptions {
                debug,
                ..LaunchOptions::default()
            },
            port: 6667,
            skip_build: false,
        }
    }
}

pub fn simulator() -> ExecutionDestination {
    ExecutionDestination::simulator(SIM_ID, "iPhone 16")
}

pub fn device() -> ExecutionDestination {
    ExecutionDestination::device(DEVICE_ID, "")
}

/// `simctl list devices --json` with the target and one other simulator.
pub fn simulator_list(target_state: &str, other_state: &str) -> String {
    json!({
        "devices": {
            "com.apple.CoreSimulator.SimRuntime.iOS-18-0": [
                {"name": "iPhone 16", "udid": SIM_ID, "state": target_state, "isAvailable": true},
                {"name": "iPhone 16 Pro", "udid": OTHER_SIM_ID, "state": other_state, "isAvailable": true}
            ]
        }
    })
    .to_string()
}

/// Defaults with short waits so debug-server and device tests stay fast.
pub fn fast_config() -> LaunchConfig {
    let mut config = LaunchConfig::default();
    config.intervals.unlock_poll_ms = 10;
    config.intervals.debug_server_poll_ms = 10;
    config.intervals.device_settle_ms = 10;
    config.intervals.debug_server_settle_ms = 100;
    config.timeouts.debug_server_ready_seconds = 1;
    config.timeouts.cleanup_seconds = 1;
    config.debug.server_path = Some(PathBuf::from(DEBUGSERVER));
    config
}

pub fn context(runner: &Arc<ScriptedRunner>, config: LaunchConfig) -> LaunchContext {
    LaunchContext::new(runner.clone(), CancelToken::new(), config)
}

/// Booted target simulator, bundle id readable, launch prints a pid.
pub fn simulator_runner() -> Arc<ScriptedRunner> {
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .respond(&["simctl", "list"], Response::stdout(simulator_list("Booted", "Shutdown")))
        .respond(&["plutil"], Response::stdout(format!("{}\n", BUNDLE_ID)))
        .respond(
            &["simctl", "launch"],
            Response::stdout(format!("{}: {}\n", BUNDLE_ID, APP_PID)),
        );
    runner
}

pub fn lock_payload(state: &str) -> Response {
    Response::json(json!({"result": {"lockState": state}}))
}

pub fn details_payload(pairing: &str, tunnel: &str) -> Response {
    Response::json(json!({
        "result": {
            "connectionProperties": {
                "pairingState": pairing,
                "tunnelState": tunnel,
                "transportType": "wired"
            },
            "deviceProperties": {"name": "Test iPhone"}
        }
    }))
}

/// Paired, connected device; lock state answers come from `lock_states`.
pub fn device_runner(lock_states: Vec<Response>) -> Arc<ScriptedRunner> {
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .respond(&["devicectl", "details"], details_payload("paired", "connected"))
        .on(&["devicectl", "lockState"], lock_states)
        .respond(
            &["devicectl", "processes"],
            Response::json(json!({
                "result": {
                    "runningProcesses": [
                        {
                            "executable": "file:///private/var/containers/Bundle/Application/1F2E/Demo.app/Demo",
                            "processIdentifier": STALE_DEVICE_PID
                        },
                        {
                            "executable": "file:///private/var/containers/Bundle/Application/9A8B/Other.app/Other",
                            "processIdentifier": 901
                        }
                    ]
                }
            })),
        )
        .respond(
            &["devicectl", "launch"],
            Response::json(json!({
                "result": {"process": {"processIdentifier": DEVICE_APP_PID}}
            })),
        )
        .respond(&["plutil"], Response::stdout(format!("{}\n", BUNDLE_ID)));
    runner
}

/// A session host that attaches every time and remembers the request.
#[derive(Default)]
pub struct AcceptingHost {
    pub configs: Mutex<Vec<AttachConfiguration>>,
}

impl SessionHost for AcceptingHost {
    fn start_session(&self, config: &AttachConfiguration) -> AttachOutcome {
        self.configs.lock().unwrap().push(config.clone());
        AttachOutcome::Started
    }
}
