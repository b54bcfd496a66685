//! Builder: `bazel build` with destination-specific flags

use std::path::Path;

use launch_process::CommandSpec;
use tracing::info;

use crate::config::BuildSettings;
use crate::context::LaunchContext;
use crate::destination::DestinationKind;
use crate::error::StepResult;
use crate::target::Label;

/// `<bazel> build <label> <flags…>` for `kind`, run in `workspace_root`.
///
/// Flag order: common flags, destination flags, then debug flags.
pub fn build_command(
    settings: &BuildSettings,
    workspace_root: &Path,
    label: &Label,
    kind: DestinationKind,
    debug: bool,
) -> CommandSpec {
    let destination_flags = match kind {
        DestinationKind::Simulator => &settings.simulator_flags,
        DestinationKind::Device => &settings.device_flags,
    };
    let mut spec = CommandSpec::new(settings.bazel.clone())
        .arg("build")
        .arg(label.canonical())
        .args(settings.flags.iter().cloned())
        .args(destination_flags.iter().cloned());
    if debug {
        spec = spec.args(settings.debug_flags.iter().cloned());
    }
    spec.cwd(workspace_root)
}

pub struct Builder<'a> {
    ctx: &'a LaunchContext,
}

impl<'a> Builder<'a> {
    pub fn new(ctx: &'a LaunchContext) -> Self {
        Self { ctx }
    }

    /// Build `label`; a non-zero exit carries the captured build output.
    pub fn build(
        &self,
        workspace_root: &Path,
        label: &Label,
        kind: DestinationKind,
        debug: bool,
    ) -> StepResult<()> {
        let spec = build_command(&self.ctx.config.build, workspace_root, label, kind, debug)
            .timeout(self.ctx.config.timeouts.build());
        info!("building {} for {}", label.canonical(), kind);
        self.ctx.run_checked("build", &spec)?;
        Ok(())
    }
}
