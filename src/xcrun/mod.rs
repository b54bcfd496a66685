//! Wrappers over the Xcode command-line tools
//!
//! - [`simctl`]: simulator lifecycle, install and launch
//! - [`devicectl`]: physical device queries, install and launch
//!
//! Every call goes through the [`LaunchContext`](crate::context::LaunchContext)
//! runner so tests can script the tool output.

pub mod devicectl;
pub mod simctl;

pub use devicectl::Devicectl;
pub use simctl::Simctl;
