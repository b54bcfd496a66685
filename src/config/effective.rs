//! Effective configuration with provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::LaunchConfig;
use super::merge::merge_layers;

/// Repo config file name, looked up in the workspace root.
pub const REPO_CONFIG_FILE: &str = ".ios-launch.toml";

/// Where a layer came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus the layers that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// Typed result of the merge
    pub config: LaunchConfig,

    /// Contributing sources, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("cannot parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// `$HOME/.config/ios-launch/config.toml`
pub fn host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".config").join("ios-launch").join("config.toml"))
}

/// `<workspace>/.ios-launch.toml`
pub fn repo_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(REPO_CONFIG_FILE)
}

impl EffectiveConfig {
    /// Merge built-in defaults, the optional host and repo files (skipped when
    /// absent) and CLI overrides.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let builtin = serde_json::to_value(LaunchConfig::default()).map_err(|e| {
            ConfigError::Validation(format!("cannot serialize defaults: {}", e))
        })?;
        let mut layers = vec![builtin];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        let files = [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ];
        for (origin, path) in files {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let config: LaunchConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        config.validate()?;

        Ok(Self {
            created_at: Utc::now(),
            config,
            sources,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a TOML file into a JSON value, returning its digest too.
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: display.clone(),
        message: format!("invalid UTF-8: {}", e),
    })?;
    let value: Value = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: display,
        message: e.to_string(),
    })?;

    Ok((value, digest))
}
