//! Launch output parsing
//!
//! simctl prints `<bundle-id>: <pid>` on stdout; devicectl writes a JSON
//! payload with the pid at `result.process.processIdentifier`. Both end up
//! as a [`LaunchResult`].

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Trailing `: <digits>` on a simctl launch line.
const SIMCTL_PID_PATTERN: &str = r":\s*(\d+)\s*$";

/// Outcome of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub pid: u32,
    pub bundle_id: String,
    pub destination_id: String,
    pub artifact: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PidParseError {
    #[error("launch output has no process identifier: {0:?}")]
    Missing(String),

    #[error("process identifier out of range: {0}")]
    OutOfRange(String),

    #[error("invalid pid pattern: {0}")]
    Pattern(String),
}

/// Raw launch tool output, per destination kind.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutput {
    /// simctl stdout
    Line(String),
    /// devicectl `--json-output` payload
    Payload(Value),
}

impl LaunchOutput {
    pub fn pid(&self) -> Result<u32, PidParseError> {
        match self {
            LaunchOutput::Line(text) => parse_simctl_pid(text),
            LaunchOutput::Payload(payload) => parse_devicectl_pid(payload),
        }
    }

    /// Normalize into a [`LaunchResult`].
    pub fn into_result(
        self,
        bundle_id: &str,
        destination_id: &str,
        artifact: PathBuf,
    ) -> Result<LaunchResult, PidParseError> {
        Ok(LaunchResult {
            pid: self.pid()?,
            bundle_id: bundle_id.to_string(),
            destination_id: destination_id.to_string(),
            artifact,
        })
    }
}

/// Pid from simctl launch stdout. The last matching line wins.
pub fn parse_simctl_pid(output: &str) -> Result<u32, PidParseError> {
    let re = Regex::new(SIMCTL_PID_PATTERN).map_err(|e| PidParseError::Pattern(e.to_string()))?;
    let digits = output
        .lines()
        .rev()
        .find_map(|line| re.captures(line.trim_end()))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| PidParseError::Missing(output.trim().to_string()))?;
    parse_pid_digits(&digits)
}

/// Pid from a devicectl launch payload.
pub fn parse_devicectl_pid(payload: &Value) -> Result<u32, PidParseError> {
    let field = &payload["result"]["process"]["processIdentifier"];
    match field.as_u64() {
        Some(pid) => u32::try_from(pid)
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| PidParseError::OutOfRange(pid.to_string())),
        None => Err(PidParseError::Missing(payload.to_string())),
    }
}

fn parse_pid_digits(digits: &str) -> Result<u32, PidParseError> {
    digits
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| PidParseError::OutOfRange(digits.to_string()))
}
