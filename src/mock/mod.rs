//! Scripted tool runner for tests
//!
//! Stands in for `xcrun`, `bazel`, `codesign`, `lsof` and `debugserver` so
//! the whole workflow can run off a Mac. Supports:
//!
//! - **Scripted responses**: per-command queues whose last entry repeats
//! - **Failure injection**: non-zero exits, timeouts, delays
//! - **devicectl JSON**: payloads written to the `--json-output` path
//! - **Background processes**: exit after N polls, or run until killed
//! - **Call recording**: every command run, spawned or killed

mod failure;
mod progress;
mod runner;

pub use failure::{ProcessScript, Response};
pub use progress::{ProgressLine, RecordingProgress};
pub use runner::{ScriptedProcess, ScriptedRunner};
