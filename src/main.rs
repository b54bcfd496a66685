//! ios-launch CLI
//!
//! Entry point for the `ios-launch` command-line tool.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use ios_launch::attach::{LldbSessionHost, ManualSessionHost, SessionHost};
use ios_launch::config::{host_config_path, repo_config_path, ConfigError, EffectiveConfig};
use ios_launch::locator::find_workspace_root;
use ios_launch::orchestrator::{Completion, Orchestrator, RunRequest};
use ios_launch::progress::TerminalProgress;
use ios_launch::record::{self, LastLaunch};
use ios_launch::{signal, BuildTarget, ExecutionDestination, ExitCode, LaunchContext, LaunchOptions};
use launch_process::{CancelToken, SystemRunner};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{warn, Level};

#[derive(Parser)]
#[command(name = "ios-launch")]
#[command(about = "Build, launch and debug Bazel-built iOS apps", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, install and launch an app, optionally under the debugger
    Run(RunArgs),

    /// Show the last successful launch from this workspace
    Last {
        /// Any directory inside the workspace
        #[arg(long, default_value = ".")]
        package: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration and where it came from
    Config {
        /// Any directory inside the workspace
        #[arg(long, default_value = ".")]
        package: PathBuf,

        /// Repo config file (default: <workspace>/.ios-launch.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("destination").required(true).args(["simulator", "device"])))]
struct RunArgs {
    /// Bazel label of the application target, e.g. //Apps/Demo:Demo
    label: String,

    /// Package directory of the target (anywhere inside the workspace)
    #[arg(long, default_value = ".")]
    package: PathBuf,

    /// Simulator UDID
    #[arg(long)]
    simulator: Option<String>,

    /// Device UDID
    #[arg(long)]
    device: Option<String>,

    /// Start paused and attach a debugger
    #[arg(long)]
    debug: bool,

    /// Debug server port
    #[arg(long)]
    port: Option<u16>,

    /// Argument passed to the app (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    args: Vec<String>,

    /// Environment variable for the app, NAME=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_env)]
    env: Vec<(String, String)>,

    /// Reuse the existing build output
    #[arg(long)]
    skip_build: bool,

    /// How to start the debug session
    #[arg(long, value_enum, default_value_t = AttachMode::Manual)]
    attach: AttachMode,

    /// Repo config file (default: <workspace>/.ios-launch.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AttachMode {
    /// Print attach instructions
    Manual,
    /// Start lldb in this terminal
    Lldb,
}

fn parse_env(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{}`", s)),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let code = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Last { package, json } => cmd_last(&package, json),
        Commands::Config {
            package,
            config,
            json,
        } => cmd_config(&package, config.as_deref(), json),
    };
    process::exit(code);
}

/// Host, repo (or explicit) and CLI layers on top of the built-in defaults.
fn load_config(
    package: &Path,
    explicit: Option<&Path>,
    overrides: Option<serde_json::Value>,
) -> Result<EffectiveConfig, ConfigError> {
    let (root, _) = find_workspace_root(package);
    let repo = explicit
        .map(Path::to_path_buf)
        .or_else(|| root.as_deref().map(repo_config_path));
    let host = host_config_path();
    EffectiveConfig::build(host.as_deref(), repo.as_deref(), overrides)
}

fn cmd_run(args: RunArgs) -> i32 {
    let target = match BuildTarget::application(&args.label, &args.package) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::Config.as_i32();
        }
    };

    let overrides = args
        .port
        .map(|port| serde_json::json!({ "debug": { "port": port } }));
    let effective = match load_config(&args.package, args.config.as_deref(), overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::Config.as_i32();
        }
    };
    let port = effective.config.debug.port;

    let cancel = CancelToken::new();
    if let Err(e) = signal::install(cancel.clone()) {
        warn!("could not install interrupt handler: {}", e);
    }
    let ctx = LaunchContext::new(Arc::new(SystemRunner::new()), cancel, effective.config);

    let destination = match (args.simulator, args.device) {
        (Some(udid), _) => ExecutionDestination::simulator(udid.clone(), udid),
        (None, Some(udid)) => ExecutionDestination::device(udid.clone(), udid),
        (None, None) => {
            eprintln!("error: one of --simulator or --device is required");
            return ExitCode::Config.as_i32();
        }
    };
    let kind = destination.kind();

    let request = RunRequest {
        target,
        destination,
        options: LaunchOptions {
            args: args.args,
            env: args.env.into_iter().collect(),
            debug: args.debug,
        },
        port,
        skip_build: args.skip_build,
    };

    let host: Box<dyn SessionHost> = match args.attach {
        AttachMode::Manual => Box::new(ManualSessionHost),
        AttachMode::Lldb => Box::new(LldbSessionHost::default()),
    };
    let report = Orchestrator::new(&ctx, &TerminalProgress, host.as_ref()).run(&request);

    if let Some(ref launch) = report.launch {
        println!(
            "Launched {} on {} (pid {})",
            launch.bundle_id,
            report.destination.describe(),
            launch.pid
        );
        if let Some(ref root) = report.workspace_root {
            let debug_port = report.debug_session.as_ref().map(|s| s.port);
            let last = LastLaunch::new(&request.target.label, kind, launch.clone(), debug_port);
            if let Err(e) = record::save(root, &last) {
                warn!("could not save last launch record: {}", e);
            }
        }
    }

    match report.completion {
        Completion::Succeeded => {}
        Completion::Warning(ref notices) => {
            for notice in notices {
                eprintln!("warning: {}", notice);
            }
        }
        Completion::Failed(ref e) => eprintln!("{}", e.render(kind)),
    }
    report.completion.exit_code().as_i32()
}

fn cmd_last(package: &Path, json: bool) -> i32 {
    let (root, _) = find_workspace_root(package);
    let Some(root) = root else {
        eprintln!("error: {} is not inside a Bazel workspace", package.display());
        return ExitCode::Config.as_i32();
    };

    match record::load(&root) {
        Ok(Some(last)) if json => match serde_json::to_string_pretty(&last) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::Success.as_i32()
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::Config.as_i32()
            }
        },
        Ok(Some(last)) => {
            println!("{}", last.to_human());
            ExitCode::Success.as_i32()
        }
        Ok(None) => {
            eprintln!("No launch recorded in {}", root.display());
            ExitCode::NotFound.as_i32()
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::Config.as_i32()
        }
    }
}

fn cmd_config(package: &Path, explicit: Option<&Path>, json: bool) -> i32 {
    let effective = match load_config(package, explicit, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::Config.as_i32();
        }
    };

    if json {
        return match effective.to_json() {
            Ok(text) => {
                println!("{}", text);
                ExitCode::Success.as_i32()
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::Config.as_i32()
            }
        };
    }

    println!("Sources (lowest precedence first):");
    for source in &effective.sources {
        let path = source.path.as_deref().unwrap_or("-");
        match source.digest {
            Some(ref digest) => println!("  {:?}: {} (sha256 {})", source.origin, path, digest),
            None => println!("  {:?}: {}", source.origin, path),
        }
    }
    match toml::to_string_pretty(&effective.config) {
        Ok(text) => {
            println!();
            print!("{}", text);
            ExitCode::Success.as_i32()
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::Config.as_i32()
        }
    }
}
