//! ios-launch - build, install, launch and debug Bazel-built iOS apps
//!
//! This crate drives one build-launch-debug run against either an iOS
//! simulator or a physical device: it builds the Bazel target, readies the
//! destination, locates and prepares the app bundle, installs and launches
//! it, and optionally brings up a debug server and an LLDB session.

pub mod attach;
pub mod builder;
pub mod config;
pub mod context;
pub mod debug_server;
pub mod destination;
pub mod error;
pub mod gatekeeper;
pub mod launch;
pub mod locator;
pub mod mock;
pub mod orchestrator;
pub mod prepare;
pub mod progress;
pub mod record;
pub mod signal;
pub mod target;
pub mod xcrun;

pub use attach::{AttachConfiguration, AttachOutcome, SessionHost};
pub use config::{EffectiveConfig, LaunchConfig};
pub use context::LaunchContext;
pub use destination::{DestinationKind, ExecutionDestination};
pub use error::{ExitCode, LaunchError, StepResult};
pub use launch::{LaunchOptions, LaunchResult, LaunchState};
pub use orchestrator::{Completion, Orchestrator, RunReport, RunRequest};
pub use target::{BuildTarget, Label};
