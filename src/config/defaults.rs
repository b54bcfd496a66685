//! Typed configuration and built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ConfigError;

/// Default debug-server port.
pub const DEFAULT_DEBUG_PORT: u16 = 6667;

/// Fully merged, typed configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub build: BuildSettings,
    pub timeouts: Timeouts,
    pub intervals: Intervals,
    pub install: InstallSettings,
    pub debug: DebugSettings,
}

/// Build system invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Build tool (`bazel` or `bazelisk`)
    pub bazel: String,
    /// Flags added to every build
    pub flags: Vec<String>,
    pub simulator_flags: Vec<String>,
    pub device_flags: Vec<String>,
    /// Flags added when a debugger will attach
    pub debug_flags: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            bazel: "bazel".to_string(),
            flags: Vec::new(),
            simulator_flags: vec!["--ios_multi_cpus=sim_arm64".to_string()],
            device_flags: vec!["--ios_multi_cpus=arm64".to_string()],
            debug_flags: vec!["--compilation_mode=dbg".to_string()],
        }
    }
}

/// Upper bounds on individual steps, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub build_seconds: u64,
    pub install_seconds: u64,
    pub boot_seconds: u64,
    pub launch_seconds: u64,
    pub unlock_seconds: u64,
    /// Stale debug-server cleanup
    pub cleanup_seconds: u64,
    pub debug_server_ready_seconds: u64,
    /// Short queries (`simctl list`, `devicectl device info`, `codesign`)
    pub query_seconds: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            build_seconds: 1800,
            install_seconds: 120,
            boot_seconds: 120,
            launch_seconds: 60,
            unlock_seconds: 60,
            cleanup_seconds: 5,
            debug_server_ready_seconds: 10,
            query_seconds: 30,
        }
    }
}

impl Timeouts {
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_seconds)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_seconds)
    }

    pub fn boot(&self) -> Duration {
        Duration::from_secs(self.boot_seconds)
    }

    pub fn launch(&self) -> Duration {
        Duration::from_secs(self.launch_seconds)
    }

    pub fn unlock(&self) -> Duration {
        Duration::from_secs(self.unlock_seconds)
    }

    pub fn cleanup(&self) -> Duration {
        Duration::from_secs(self.cleanup_seconds)
    }

    pub fn debug_server_ready(&self) -> Duration {
        Duration::from_secs(self.debug_server_ready_seconds)
    }

    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_seconds)
    }
}

/// Polling and settle intervals, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub unlock_poll_ms: u64,
    pub debug_server_poll_ms: u64,
    /// Wait before attaching to a device
    pub device_settle_ms: u64,
    /// Wait used by the `settle` readiness mode
    pub debug_server_settle_ms: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            unlock_poll_ms: 1000,
            debug_server_poll_ms: 250,
            device_settle_ms: 2000,
            debug_server_settle_ms: 1500,
        }
    }
}

impl Intervals {
    pub fn unlock_poll(&self) -> Duration {
        Duration::from_millis(self.unlock_poll_ms)
    }

    pub fn debug_server_poll(&self) -> Duration {
        Duration::from_millis(self.debug_server_poll_ms)
    }

    pub fn device_settle(&self) -> Duration {
        Duration::from_millis(self.device_settle_ms)
    }

    pub fn debug_server_settle(&self) -> Duration {
        Duration::from_millis(self.debug_server_settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Total install attempts on a simulator (first try included)
    pub max_attempts: u32,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// How debug-server readiness is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    /// Poll the port until it is listening
    #[default]
    Poll,
    /// Wait a fixed interval, failing only on early exit
    Settle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub port: u16,
    /// Explicit debugserver path; resolved from the active Xcode when unset
    pub server_path: Option<PathBuf>,
    pub readiness: ReadinessMode,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_DEBUG_PORT,
            server_path: None,
            readiness: ReadinessMode::Poll,
        }
    }
}

impl LaunchConfig {
    /// Reject values that would make a step impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timeouts;
        let timeouts = [
            ("timeouts.build_seconds", t.build_seconds),
            ("timeouts.install_seconds", t.install_seconds),
            ("timeouts.boot_seconds", t.boot_seconds),
            ("timeouts.launch_seconds", t.launch_seconds),
            ("timeouts.unlock_seconds", t.unlock_seconds),
            ("timeouts.cleanup_seconds", t.cleanup_seconds),
            ("timeouts.debug_server_ready_seconds", t.debug_server_ready_seconds),
            ("timeouts.query_seconds", t.query_seconds),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{} must be > 0", key)));
            }
        }

        if self.intervals.unlock_poll_ms == 0 || self.intervals.debug_server_poll_ms == 0 {
            return Err(ConfigError::Validation(
                "poll intervals must be > 0".to_string(),
            ));
        }
        if self.install.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "install.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.debug.port == 0 {
            return Err(ConfigError::Validation("debug.port must be > 0".to_string()));
        }
        if self.build.bazel.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.bazel must name a program".to_string(),
            ));
        }
        Ok(())
    }
}
