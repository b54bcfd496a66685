//! Bundle Locator
//!
//! Finds the Bazel workspace root above a target's package directory, then
//! probes the `bazel-bin` output tree for the artifact the build produced.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::destination::DestinationKind;
use crate::error::{LaunchError, StepResult};
use crate::target::{BuildTarget, Label};

/// Files that mark a Bazel workspace root, checked in this order.
pub const WORKSPACE_MARKERS: [&str; 3] = ["MODULE.bazel", "WORKSPACE.bazel", "WORKSPACE"];

/// Upper bound on parent directories visited while looking for a marker.
pub const MAX_WALK_HOPS: usize = 16;

/// Bazel's output symlink directory under the workspace root.
pub const OUTPUT_DIR: &str = "bazel-bin";

/// A resolved artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifactLocation {
    /// Absolute path of the `.app` or `.ipa`
    pub artifact: PathBuf,
    pub workspace_root: PathBuf,
}

impl BuildArtifactLocation {
    /// True for a packaged `.ipa`.
    pub fn is_ipa(&self) -> bool {
        self.artifact.extension().map(|e| e == "ipa").unwrap_or(false)
    }
}

/// Walk upward from `start` looking for a workspace marker.
///
/// Returns the root and the directories visited, in order.
pub fn find_workspace_root(start: &Path) -> (Option<PathBuf>, Vec<PathBuf>) {
    let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let mut visited = Vec::new();

    for dir in start.ancestors().take(MAX_WALK_HOPS + 1) {
        visited.push(dir.to_path_buf());
        if WORKSPACE_MARKERS.iter().any(|m| dir.join(m).is_file()) {
            debug!("workspace root: {}", dir.display());
            return (Some(dir.to_path_buf()), visited);
        }
    }
    (None, visited)
}

/// Workspace root for `target`, or `NotFound` listing every directory checked.
pub fn workspace_root(target: &BuildTarget) -> StepResult<PathBuf> {
    match find_workspace_root(&target.package_path) {
        (Some(root), _) => Ok(root),
        (None, visited) => Err(LaunchError::not_found(
            format!(
                "Bazel workspace root ({}) above {}",
                WORKSPACE_MARKERS.join(", "),
                target.package_path.display()
            ),
            visited,
        )),
    }
}

/// Candidate artifact paths in probe order.
pub fn candidate_paths(root: &Path, label: &Label, kind: DestinationKind) -> Vec<PathBuf> {
    let base = root.join(OUTPUT_DIR).join(label.relative_path());
    let with_ext = |ext: &str| {
        let mut path = base.clone().into_os_string();
        path.push(".");
        path.push(ext);
        PathBuf::from(path)
    };
    match kind {
        DestinationKind::Simulator => vec![with_ext("app")],
        DestinationKind::Device => vec![with_ext("ipa"), with_ext("app")],
    }
}

/// Locate the artifact built for `target`.
pub fn locate(target: &BuildTarget, kind: DestinationKind) -> StepResult<BuildArtifactLocation> {
    let label = target
        .parsed_label()
        .map_err(|e| LaunchError::Config(e.to_string()))?;
    let root = workspace_root(target)?;

    let candidates = candidate_paths(&root, &label, kind);
    for candidate in &candidates {
        debug!("probing {}", candidate.display());
        if candidate.exists() {
            return Ok(BuildArtifactLocation {
                artifact: candidate.clone(),
                workspace_root: root,
            });
        }
    }

    Err(LaunchError::not_found(
        format!("{} artifact for {}", kind, label.canonical()),
        candidates,
    ))
}
