//! Last-launch record
//!
//! `<workspace>/.ios-launch/last_launch.json`, rewritten after every
//! successful launch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::destination::DestinationKind;
use crate::launch::LaunchResult;

/// Schema identifier
pub const SCHEMA_ID: &str = "ios-launch/last_launch@1";

/// State directory under the workspace root.
pub const STATE_DIR: &str = ".ios-launch";

pub const RECORD_FILE: &str = "last_launch.json";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastLaunch {
    pub schema_id: String,
    pub recorded_at: DateTime<Utc>,
    pub label: String,
    pub destination_kind: DestinationKind,
    #[serde(flatten)]
    pub launch: LaunchResult,
    /// Port of the debug server, when launched for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_port: Option<u16>,
}

impl LastLaunch {
    pub fn new(
        label: impl Into<String>,
        destination_kind: DestinationKind,
        launch: LaunchResult,
        debug_port: Option<u16>,
    ) -> Self {
        Self {
            schema_id: SCHEMA_ID.to_string(),
            recorded_at: Utc::now(),
            label: label.into(),
            destination_kind,
            launch,
            debug_port,
        }
    }

    /// Human-readable summary.
    pub fn to_human(&self) -> String {
        let mut out = format!(
            "{} ({})\n  pid:         {}\n  {}: {}\n  artifact:    {}\n  launched at: {}",
            self.label,
            self.launch.bundle_id,
            self.launch.pid,
            self.destination_kind,
            self.launch.destination_id,
            self.launch.artifact.display(),
            self.recorded_at.to_rfc3339(),
        );
        if let Some(port) = self.debug_port {
            out.push_str(&format!("\n  debug port:  {}", port));
        }
        out
    }
}

pub fn record_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(STATE_DIR).join(RECORD_FILE)
}

/// Write atomically (write-then-rename).
pub fn save(workspace_root: &Path, record: &LastLaunch) -> Result<PathBuf, RecordError> {
    let path = record_path(workspace_root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, &path)?;
    Ok(path)
}

/// `None` when nothing has been launched from this workspace yet.
pub fn load(workspace_root: &Path) -> Result<Option<LastLaunch>, RecordError> {
    let path = record_path(workspace_root);
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&json)?))
}
