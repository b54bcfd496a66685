//! External tool execution for ios-launch
//!
//! Every step of the build-launch-debug workflow shells out to an external
//! tool (`bazel`, `xcrun simctl`, `xcrun devicectl`, `codesign`, `lsof`,
//! `debugserver`). This crate is the single leaf they all go through:
//!
//! - [`CommandSpec`]: program, arguments, working directory, environment
//!   overrides and an optional timeout
//! - [`ToolRunner`]: runs a spec to completion (captured output) or spawns it
//!   in the background, and answers process-table questions
//! - [`SystemRunner`]: the real implementation on `std::process` + `nix`
//! - [`CancelToken`]: cooperative cancellation shared across threads
//!
//! Output is captured on reader threads while the caller waits, so a chatty
//! child never blocks on a full pipe.

mod cancel;
mod command;
mod error;
mod process;
mod runner;
mod spawned;

pub use cancel::CancelToken;
pub use command::CommandSpec;
pub use error::{ToolError, ToolResult};
pub use process::{is_process_alive, kill_process};
pub use runner::{SystemRunner, ToolOutput, ToolRunner};
pub use spawned::{CapturedOutput, ExitInfo, SpawnedProcess, SystemProcess};

/// Granularity of every wait loop in this crate.
pub const POLL_INTERVAL_MS: u64 = 50;
