//! App Preparer
//!
//! Reads the bundle identifier from `Info.plist` and gets the artifact ready
//! for its destination: simulators get permission fix-up and an ad-hoc
//! signature, devices only get their existing signature verified.
//!
//! Preparation never fails the run; problems come back as warnings.

use std::fs;
use std::path::{Path, PathBuf};

use launch_process::CommandSpec;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::context::LaunchContext;
use crate::destination::DestinationKind;
use crate::error::{LaunchError, StepResult};

/// Bundle metadata file.
pub const INFO_PLIST: &str = "Info.plist";

/// Key holding the bundle identifier.
pub const BUNDLE_ID_KEY: &str = "CFBundleIdentifier";

/// An `.app` directory ready for inspection.
///
/// For an `.ipa` this is the extracted `Payload/*.app`; the extraction lives
/// as long as this value.
#[derive(Debug)]
pub struct AppBundle {
    /// The artifact as located (`.app` or `.ipa`)
    pub artifact: PathBuf,
    /// The `.app` directory
    pub app_dir: PathBuf,
    extracted: Option<TempDir>,
}

impl AppBundle {
    /// Open `artifact`, extracting it first when it is an `.ipa`.
    pub fn open(ctx: &LaunchContext, artifact: &Path) -> StepResult<Self> {
        if !artifact.exists() {
            return Err(LaunchError::not_found(
                "application bundle",
                vec![artifact.to_path_buf()],
            ));
        }

        if artifact.extension().map(|e| e == "ipa").unwrap_or(false) {
            let dir = TempDir::new().map_err(|e| LaunchError::io("create extraction dir", e))?;
            let spec = CommandSpec::new("unzip")
                .args(["-q", "-o"])
                .arg(artifact.display().to_string())
                .arg("-d")
                .arg(dir.path().display().to_string())
                .timeout(ctx.config.timeouts.install());
            ctx.run_checked("extract ipa", &spec)?;

            let app_dir = find_payload_app(dir.path())?;
            debug!("extracted {} to {}", artifact.display(), app_dir.display());
            return Ok(Self {
                artifact: artifact.to_path_buf(),
                app_dir,
                extracted: Some(dir),
            });
        }

        if !artifact.is_dir() {
            return Err(LaunchError::not_found(
                "application bundle directory",
                vec![artifact.to_path_buf()],
            ));
        }

        Ok(Self {
            artifact: artifact.to_path_buf(),
            app_dir: artifact.to_path_buf(),
            extracted: None,
        })
    }

    pub fn info_plist(&self) -> PathBuf {
        self.app_dir.join(INFO_PLIST)
    }

    /// Bundle name without the `.app` suffix.
    pub fn name(&self) -> String {
        self.app_dir
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The single `Payload/*.app` inside an extracted `.ipa`.
fn find_payload_app(extracted: &Path) -> StepResult<PathBuf> {
    let payload = extracted.join("Payload");
    let entries = fs::read_dir(&payload).map_err(|_| {
        LaunchError::not_found("Payload directory in ipa", vec![payload.clone()])
    })?;
    let mut apps: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.extension().map(|e| e == "app").unwrap_or(false))
        .collect();
    apps.sort();
    match apps.len() {
        0 => Err(LaunchError::not_found(
            "Payload/*.app in ipa",
            vec![payload],
        )),
        1 => Ok(apps.remove(0)),
        n => Err(LaunchError::state(
            payload.display().to_string(),
            format!("ipa contains {} app bundles, expected one", n),
        )),
    }
}

/// Bundle identifier of an opened bundle.
///
/// A missing `Info.plist` and a missing key are reported separately.
pub fn identify_bundle(ctx: &LaunchContext, bundle: &AppBundle) -> StepResult<String> {
    let plist = bundle.info_plist();
    if !plist.is_file() {
        return Err(LaunchError::not_found(INFO_PLIST, vec![plist]));
    }

    let spec = CommandSpec::new("plutil")
        .args(["-extract", BUNDLE_ID_KEY, "raw", "-o", "-"])
        .arg(plist.display().to_string())
        .timeout(ctx.query_timeout());
    let output = ctx.run("read bundle identifier", &spec)?;

    let bundle_id = output.stdout.trim();
    if !output.success() || bundle_id.is_empty() {
        debug!("plutil: {}", output.stderr.trim());
        return Err(LaunchError::not_found(
            format!("{} in {}", BUNDLE_ID_KEY, INFO_PLIST),
            vec![plist],
        ));
    }
    Ok(bundle_id.to_string())
}

/// Ready an opened bundle for `kind`. Returns warnings; never fails.
pub fn prepare_bundle(ctx: &LaunchContext, bundle: &AppBundle, kind: DestinationKind) -> Vec<String> {
    let mut warnings = Vec::new();
    match kind {
        DestinationKind::Simulator => {
            if bundle.extracted.is_some() {
                warnings.push(format!(
                    "{} is a device package; simulators need an .app",
                    bundle.artifact.display()
                ));
                return warnings;
            }
            if let Err(e) = normalize_permissions(&bundle.app_dir) {
                warnings.push(format!("could not fix permissions: {}", e));
            }
            let spec = CommandSpec::new("codesign")
                .args([
                    "--force",
                    "--sign",
                    "-",
                    "--timestamp=none",
                    "--preserve-metadata=entitlements",
                ])
                .arg(bundle.app_dir.display().to_string())
                .timeout(ctx.query_timeout());
            match ctx.run_checked("ad-hoc re-sign", &spec) {
                Ok(_) => info!("re-signed {} ad-hoc", bundle.app_dir.display()),
                Err(e) => warnings.push(e.to_string()),
            }
        }
        DestinationKind::Device => {
            let spec = CommandSpec::new("codesign")
                .args(["--verify", "--deep", "--strict"])
                .arg(bundle.app_dir.display().to_string())
                .timeout(ctx.query_timeout());
            if let Err(e) = ctx.run_checked("verify signature", &spec) {
                let detail = e.captured_output().unwrap_or_default();
                warnings.push(format!(
                    "signature of {} did not verify; install will likely fail. {}",
                    bundle.artifact.display(),
                    detail.trim()
                ));
            }
        }
    }

    for w in &warnings {
        warn!("prepare: {}", w);
    }
    warnings
}

/// `u+rwx,go+rx` on directories and executables, `u+rw,go+r` on files.
#[cfg(unix)]
fn normalize_permissions(root: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.path_is_symlink() {
            continue;
        }
        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        let mode = metadata.permissions().mode();
        let executable = metadata.is_dir() || mode & 0o100 != 0;
        let wanted = if executable {
            mode | 0o755
        } else {
            mode | 0o644
        };
        if wanted != mode {
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(wanted))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn normalize_permissions(_root: &Path) -> std::io::Result<()> {
    Ok(())
}
