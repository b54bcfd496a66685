//! Layered configuration
//!
//! Four layers, later ones win:
//! 1. Built-in defaults
//! 2. Host config (`~/.config/ios-launch/config.toml`)
//! 3. Repo config (`<workspace>/.ios-launch.toml`)
//! 4. CLI overrides

mod defaults;
mod effective;
mod merge;

pub use defaults::{
    BuildSettings, DebugSettings, InstallSettings, Intervals, LaunchConfig, ReadinessMode,
    Timeouts,
};
pub use effective::{
    host_config_path, repo_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
};
pub use merge::{deep_merge, merge_layers};
