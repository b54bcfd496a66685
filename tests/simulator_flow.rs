//! Simulator build-launch-debug flow against a scripted toolchain

mod fixtures;

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fixtures::*;
use ios_launch::attach::ManualSessionHost;
use ios_launch::config::{LaunchConfig, ReadinessMode};
use ios_launch::debug_server::{DebugServerState, Readiness};
use ios_launch::destination::BootState;
use ios_launch::error::{ExitCode, FailureKind};
use ios_launch::gatekeeper::Gatekeeper;
use ios_launch::mock::{ProcessScript, RecordingProgress, Response, ScriptedRunner};
use ios_launch::orchestrator::{Completion, Orchestrator, RunReport, RunRequest};
use ios_launch::progress::SilentProgress;
use ios_launch::{ExecutionDestination, LaunchError, LaunchState};

fn run(runner: &Arc<ScriptedRunner>, config: LaunchConfig, request: &RunRequest) -> RunReport {
    let ctx = context(runner, config);
    let host = AcceptingHost::default();
    Orchestrator::new(&ctx, &SilentProgress, &host).run(request)
}

fn failure(report: &RunReport) -> &LaunchError {
    report
        .completion
        .error()
        .unwrap_or_else(|| panic!("expected failure, got {:?}", report.completion))
}

fn position(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no call containing {:?} in {:#?}", needle, lines))
}

// =============================================================================
// Launch without debugging
// =============================================================================

#[test]
fn test_simulator_launch_without_debugger() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    assert!(matches!(report.completion, Completion::Succeeded), "{:?}", report.completion);
    assert_eq!(report.completion.exit_code(), ExitCode::Success);
    assert_eq!(
        report.launch_history,
        vec![
            LaunchState::Idle,
            LaunchState::Terminating,
            LaunchState::Installing,
            LaunchState::Launching,
            LaunchState::Launched,
        ]
    );
    assert_eq!(report.install_attempts, 1);
    assert!(report.debug_history.is_empty());
    assert!(report.debug_session.is_none());

    let launch = report.launch.unwrap();
    assert_eq!(launch.pid, APP_PID);
    assert_eq!(launch.bundle_id, BUNDLE_ID);
    assert_eq!(launch.destination_id, SIM_ID);
    assert_eq!(launch.artifact, ws.app_path());
    assert_eq!(report.bundle_id.as_deref(), Some(BUNDLE_ID));
    assert_eq!(report.workspace_root, Some(ws.root()));
    assert!(report.prepare_warnings.is_empty());
}

#[test]
fn test_simulator_launch_issues_tools_in_order() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();

    run(&runner, fast_config(), &ws.request(simulator(), false));

    let lines = runner.command_lines();
    let build = position(&lines, "bazel build //Apps/Demo:Demo");
    let list = position(&lines, "simctl list devices --json");
    let sign = position(&lines, "codesign --force --sign -");
    let terminate = position(&lines, "simctl terminate");
    let install = position(&lines, "simctl install");
    let launch = position(&lines, "simctl launch");
    assert!(build < list && list < sign && sign < terminate);
    assert!(terminate < install && install < launch);

    let build_call = &runner.calls_matching(&["bazel", "build"])[0];
    assert!(build_call.args.contains(&"--ios_multi_cpus=sim_arm64".to_string()));
    assert!(!build_call.args.contains(&"--compilation_mode=dbg".to_string()));
    assert_eq!(build_call.cwd, Some(ws.root()));

    let launch_call = &runner.calls_matching(&["simctl", "launch"])[0];
    assert!(!launch_call.args.contains(&"--wait-for-debugger".to_string()));
    assert!(launch_call.args.contains(&"--terminate-running-process".to_string()));

    // Target already booted, no other simulator running
    assert_eq!(runner.count(&["simctl", "shutdown"]), 0);
    assert_eq!(runner.count(&["simctl", "boot"]), 0);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_app_arguments_and_environment_reach_simctl() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let mut request = ws.request(simulator(), false);
    request.options.args = vec!["-FIRDebugEnabled".to_string(), "--mode=demo".to_string()];
    let mut env = BTreeMap::new();
    env.insert("API_URL".to_string(), "http://localhost:8080".to_string());
    request.options.env = env;

    run(&runner, fast_config(), &request);

    let launch_call = &runner.calls_matching(&["simctl", "launch"])[0];
    assert_eq!(
        launch_call.env.get("SIMCTL_CHILD_API_URL").map(String::as_str),
        Some("http://localhost:8080")
    );
    assert!(!launch_call.env.contains_key("API_URL"));
    let n = launch_call.args.len();
    assert_eq!(&launch_call.args[n - 3..], &[BUNDLE_ID, "-FIRDebugEnabled", "--mode=demo"]);
}

#[test]
fn test_skip_build_reuses_existing_output() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let mut request = ws.request(simulator(), false);
    request.skip_build = true;

    let report = run(&runner, fast_config(), &request);

    assert!(matches!(report.completion, Completion::Succeeded));
    assert_eq!(runner.count(&["bazel"]), 0);
}

// =============================================================================
// Gatekeeper
// =============================================================================

#[test]
fn test_single_simulator_ensure_is_idempotent() {
    let runner = simulator_runner();
    let ctx = context(&runner, fast_config());
    let gatekeeper = Gatekeeper::new(&ctx);
    let mut no_wait = |_: Duration| panic!("simulators never wait for unlock");

    let first = gatekeeper.ensure_ready(&simulator(), &mut no_wait).unwrap();
    let second = gatekeeper.ensure_ready(&first, &mut no_wait).unwrap();

    assert_eq!(first, second);
    assert_eq!(runner.count(&["simctl", "list"]), 2);
    assert_eq!(runner.count(&["simctl", "shutdown"]), 0);
    assert_eq!(runner.count(&["simctl", "boot"]), 0);
    assert_eq!(runner.count(&["simctl", "bootstatus"]), 0);
    assert_eq!(runner.count(&["open", "Simulator"]), 2);
}

#[test]
fn test_other_booted_simulator_is_shut_down() {
    let runner = Arc::new(ScriptedRunner::new());
    runner.respond(
        &["simctl", "list"],
        Response::stdout(simulator_list("Shutdown", "Booted")),
    );
    let ctx = context(&runner, fast_config());

    let ready = Gatekeeper::new(&ctx)
        .ensure_ready(&simulator(), &mut |_| {})
        .unwrap();

    match ready {
        ExecutionDestination::Simulator(sim) => {
            assert_eq!(sim.id, SIM_ID);
            assert_eq!(sim.boot_state, BootState::Booted);
        }
        other => panic!("expected a simulator, got {:?}", other),
    }

    let shutdowns = runner.calls_matching(&["simctl", "shutdown"]);
    assert_eq!(shutdowns.len(), 1);
    assert_eq!(shutdowns[0].args, vec!["simctl", "shutdown", OTHER_SIM_ID]);
    assert_eq!(runner.count(&["simctl", "boot", SIM_ID]), 1);
    assert_eq!(runner.count(&["simctl", "bootstatus", SIM_ID, "-b"]), 1);

    let lines = runner.command_lines();
    assert!(position(&lines, "simctl shutdown") < position(&lines, "simctl boot "));
}

#[test]
fn test_boot_tolerates_already_booted() {
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .respond(&["simctl", "list"], Response::stdout(simulator_list("Shutdown", "Shutdown")))
        .respond(
            &["simctl", "boot"],
            Response::fail(149, "Unable to boot device in current state: Booted"),
        );
    let ctx = context(&runner, fast_config());

    assert!(Gatekeeper::new(&ctx).ensure_ready(&simulator(), &mut |_| {}).is_ok());
}

#[test]
fn test_unknown_simulator_is_state_error() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let missing = ExecutionDestination::simulator("NOT-A-REAL-UDID", "ghost");

    let report = run(&runner, fast_config(), &ws.request(missing, false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::State);
    assert!(err.to_string().contains("NOT-A-REAL-UDID"));
    assert_eq!(runner.count(&["simctl", "install"]), 0);
}

// =============================================================================
// Install retry
// =============================================================================

#[test]
fn test_install_timeout_restarts_simulator_and_retries() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.on(&["simctl", "install"], vec![Response::timeout(), Response::ok()]);
    let ctx = context(&runner, fast_config());
    let progress = RecordingProgress::new();
    let host = AcceptingHost::default();

    let report = Orchestrator::new(&ctx, &progress, &host).run(&ws.request(simulator(), false));

    assert!(matches!(report.completion, Completion::Succeeded), "{:?}", report.completion);
    assert_eq!(report.install_attempts, 2);
    assert_eq!(
        report.launch_history,
        vec![
            LaunchState::Idle,
            LaunchState::Terminating,
            LaunchState::Installing,
            LaunchState::InstallTimedOut,
            LaunchState::RestartingDestination,
            LaunchState::Installing,
            LaunchState::Launching,
            LaunchState::Launched,
        ]
    );
    assert_eq!(runner.count(&["simctl", "install"]), 2);
    assert_eq!(runner.count(&["simctl", "shutdown", SIM_ID]), 1);
    assert_eq!(runner.count(&["simctl", "boot", SIM_ID]), 1);
    assert_eq!(runner.count(&["simctl", "bootstatus", SIM_ID]), 1);
    assert!(progress
        .warnings()
        .iter()
        .any(|w| w.contains("install timed out")));
}

#[test]
fn test_second_install_timeout_is_fatal() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(&["simctl", "install"], Response::timeout());

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert!(err.is_timeout());
    assert_eq!(report.completion.exit_code(), ExitCode::Timeout);
    assert_eq!(report.install_attempts, 2);
    assert_eq!(report.launch_history.last(), Some(&LaunchState::Failed));
    assert_eq!(runner.count(&["simctl", "install"]), 2);
    assert_eq!(runner.count(&["simctl", "launch"]), 0);
    assert!(report.launch.is_none());
}

#[test]
fn test_install_failure_is_not_retried() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(
        &["simctl", "install"],
        Response::fail(1, "An error was encountered processing the command (code=22)"),
    );

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::ToolInvocation);
    assert!(err.captured_output().unwrap().contains("code=22"));
    assert_eq!(report.install_attempts, 1);
    assert_eq!(runner.count(&["simctl", "shutdown"]), 0);
}

// =============================================================================
// Debug server
// =============================================================================

#[test]
fn test_crashed_app_fails_before_debugserver_starts() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.mark_dead(APP_PID);

    let report = run(&runner, fast_config(), &ws.request(simulator(), true));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::State);
    assert!(err.to_string().contains(&APP_PID.to_string()), "{}", err);
    assert_eq!(report.completion.exit_code(), ExitCode::State);
    assert_eq!(report.launch_history.last(), Some(&LaunchState::Launched));
    assert_eq!(
        report.debug_history,
        vec![
            DebugServerState::Idle,
            DebugServerState::CleaningUp,
            DebugServerState::Starting,
            DebugServerState::Failed,
        ]
    );
    assert!(runner.spawned().is_empty());

    let launch_call = &runner.calls_matching(&["simctl", "launch"])[0];
    assert!(launch_call.args.contains(&"--wait-for-debugger".to_string()));
    let build_call = &runner.calls_matching(&["bazel", "build"])[0];
    assert!(build_call.args.contains(&"--compilation_mode=dbg".to_string()));
}

#[test]
fn test_debugserver_early_exit_fails_fast() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.on_spawn(
        &[DEBUGSERVER],
        ProcessScript::exit_after(1, 1, "error: failed to attach to process 4821"),
    );

    let report = run(&runner, fast_config(), &ws.request(simulator(), true));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::ToolInvocation);
    assert!(err.to_string().contains("exit code 1"), "{}", err);
    assert!(err.captured_output().unwrap().contains("failed to attach"));
    assert_eq!(
        report.debug_history,
        vec![
            DebugServerState::Idle,
            DebugServerState::CleaningUp,
            DebugServerState::Starting,
            DebugServerState::WaitingForReady,
            DebugServerState::Failed,
        ]
    );
    assert!(report.attach.is_none());
}

#[test]
fn test_listening_debugserver_is_attached() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(&["lsof", "-sTCP:LISTEN"], Response::stdout("70000\n"));
    let ctx = context(&runner, fast_config());
    let host = AcceptingHost::default();

    let report =
        Orchestrator::new(&ctx, &SilentProgress, &host).run(&ws.request(simulator(), true));

    assert!(matches!(report.completion, Completion::Succeeded), "{:?}", report.completion);
    assert_eq!(
        report.debug_history,
        vec![
            DebugServerState::Idle,
            DebugServerState::CleaningUp,
            DebugServerState::Starting,
            DebugServerState::WaitingForReady,
            DebugServerState::Ready,
        ]
    );
    let session = report.debug_session.as_ref().unwrap();
    assert_eq!(session.readiness, Readiness::Listening);
    assert_eq!(session.port, 6667);

    let spawned = runner.spawned();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].program, DEBUGSERVER);
    assert_eq!(spawned[0].args, vec!["localhost:6667", "--attach=4821"]);

    // Stale servers are cleared before spawning
    assert_eq!(runner.count(&["lsof", "-t", "-iTCP:6667"]), 1);
    assert_eq!(runner.count(&["pkill", "-x", "debugserver"]), 1);

    let configs = host.configs.lock().unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].pid, APP_PID);
    assert_eq!(
        configs[0].attach_commands,
        vec!["process connect connect://127.0.0.1:6667".to_string()]
    );
}

#[test]
fn test_debugserver_output_goes_to_workspace_log() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.on_spawn(
        &[DEBUGSERVER],
        ProcessScript::exit_after(1, 1, "error: failed to attach to process 4821"),
    );

    let report = run(&runner, fast_config(), &ws.request(simulator(), true));

    let log = ws.root().join(".ios-launch/debugserver.log");
    assert_eq!(runner.spawned()[0].output_log.as_deref(), Some(log.as_path()));
    assert!(fs::read_to_string(&log).unwrap().contains("failed to attach"));
    assert!(failure(&report)
        .captured_output()
        .unwrap()
        .contains("failed to attach"));
}

#[test]
fn test_hung_port_lookup_does_not_stall_cleanup() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner
        .respond(&["lsof", "-sTCP:LISTEN"], Response::stdout("70000\n"))
        .respond(
            &["lsof", "-t", "-iTCP:6667"],
            Response::stdout("5511\n").with_delay(Duration::from_secs(60)),
        );
    let config = fast_config();
    assert_eq!(config.timeouts.cleanup_seconds, 1);

    let started = Instant::now();
    let report = run(&runner, config, &ws.request(simulator(), true));

    assert!(started.elapsed() < Duration::from_secs(10), "{:?}", started.elapsed());
    assert!(matches!(report.completion, Completion::Succeeded), "{:?}", report.completion);
    assert_eq!(runner.spawned().len(), 1);
    assert!(runner.killed().is_empty());
    assert_eq!(report.debug_history.last(), Some(&DebugServerState::Ready));
}

#[test]
fn test_cancel_interrupts_readiness_wait() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let mut config = fast_config();
    config.timeouts.debug_server_ready_seconds = 60;
    let ctx = context(&runner, config);

    let trigger = ctx.cancel.clone();
    let watched = Arc::clone(&runner);
    let canceller = std::thread::spawn(move || {
        while watched.spawned().is_empty() {
            std::thread::sleep(Duration::from_millis(10));
        }
        std::thread::sleep(Duration::from_millis(100));
        trigger.cancel();
    });

    let started = Instant::now();
    let report = Orchestrator::new(&ctx, &SilentProgress, &AcceptingHost::default())
        .run(&ws.request(simulator(), true));
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10), "{:?}", started.elapsed());
    match failure(&report) {
        LaunchError::Cancelled { during } => assert_eq!(during, "waiting for debug server"),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(report.completion.exit_code(), ExitCode::Cancelled);
    assert_eq!(
        report.debug_history,
        vec![
            DebugServerState::Idle,
            DebugServerState::CleaningUp,
            DebugServerState::Starting,
            DebugServerState::WaitingForReady,
            DebugServerState::Failed,
        ]
    );
    assert!(report.attach.is_none());
}

#[test]
fn test_stale_port_occupants_are_killed() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner
        .respond(&["lsof", "-sTCP:LISTEN"], Response::stdout("70000\n"))
        .respond(&["lsof", "-t", "-iTCP:6667"], Response::stdout("5511\n5512\n"));

    let report = run(&runner, fast_config(), &ws.request(simulator(), true));

    assert!(!report.completion.is_failed());
    let killed = runner.killed();
    assert!(killed.contains(&5511));
    assert!(killed.contains(&5512));
}

#[test]
fn test_custom_port_is_used_end_to_end() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(&["lsof", "-sTCP:LISTEN"], Response::stdout("70000\n"));
    let mut request = ws.request(simulator(), true);
    request.port = 7001;

    let report = run(&runner, fast_config(), &request);

    assert!(!report.completion.is_failed());
    assert_eq!(runner.spawned()[0].args[0], "localhost:7001");
    assert_eq!(runner.count(&["lsof", "-iTCP:7001", "-sTCP:LISTEN"]), 1);
}

#[test]
fn test_unconfirmed_readiness_is_a_warning() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();

    let report = run(&runner, fast_config(), &ws.request(simulator(), true));

    match report.completion {
        Completion::Warning(ref notices) => {
            assert_eq!(notices.len(), 1);
            assert!(notices[0].contains("not confirmed listening"));
        }
        ref other => panic!("expected a warning, got {:?}", other),
    }
    assert_eq!(report.completion.exit_code(), ExitCode::Warning);
    assert_eq!(report.debug_session.unwrap().readiness, Readiness::Assumed);
    assert!(runner.count(&["lsof", "-sTCP:LISTEN"]) > 1);
}

#[test]
fn test_settle_mode_skips_port_probe() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let mut config = fast_config();
    config.debug.readiness = ReadinessMode::Settle;

    let report = run(&runner, config, &ws.request(simulator(), true));

    assert!(matches!(report.completion, Completion::Succeeded), "{:?}", report.completion);
    assert_eq!(report.debug_session.unwrap().readiness, Readiness::Settled);
    assert_eq!(runner.count(&["lsof", "-sTCP:LISTEN"]), 0);
}

#[test]
fn test_manual_attach_reports_instructions() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(&["lsof", "-sTCP:LISTEN"], Response::stdout("70000\n"));
    let ctx = context(&runner, fast_config());

    let report = Orchestrator::new(&ctx, &SilentProgress, &ManualSessionHost)
        .run(&ws.request(simulator(), true));

    match report.completion {
        Completion::Warning(ref notices) => {
            assert!(notices[0].contains("process connect connect://127.0.0.1:6667"));
        }
        ref other => panic!("expected a warning, got {:?}", other),
    }
    assert!(!report.attach.unwrap().is_started());
}

// =============================================================================
// Failures before launch
// =============================================================================

#[test]
fn test_build_failure_carries_build_output() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    runner.respond(
        &["bazel", "build"],
        Response::fail(1, "ERROR: no such target '//Apps/Demo:Demo'"),
    );

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::ToolInvocation);
    assert_eq!(report.completion.exit_code(), ExitCode::ToolInvocation);
    assert!(err.captured_output().unwrap().contains("no such target"));
    assert_eq!(runner.count(&["simctl"]), 0);
}

#[test]
fn test_missing_build_output_lists_probed_paths() {
    let ws = Workspace::new();
    let runner = simulator_runner();

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_eq!(report.completion.exit_code(), ExitCode::NotFound);
    match err {
        LaunchError::NotFound { probed, .. } => assert_eq!(probed, &vec![ws.app_path()]),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert_eq!(runner.count(&["simctl", "install"]), 0);
}

#[test]
fn test_missing_info_plist_is_not_found() {
    let ws = Workspace::new();
    std::fs::create_dir_all(ws.output_dir().join("Demo.app")).unwrap();
    let runner = simulator_runner();

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert!(err.to_string().starts_with("Info.plist not found"), "{}", err);
    assert_eq!(runner.count(&["plutil"]), 0);
}

#[test]
fn test_missing_bundle_identifier_is_not_found() {
    let ws = Workspace::with_app();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .respond(&["simctl", "list"], Response::stdout(simulator_list("Booted", "Shutdown")))
        .respond(&["plutil"], Response::fail(1, "Could not extract value"));

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::NotFound);
    assert!(err.to_string().contains("CFBundleIdentifier"), "{}", err);
}

#[test]
fn test_unparseable_launch_output_is_state_error() {
    let ws = Workspace::with_app();
    let runner = Arc::new(ScriptedRunner::new());
    runner
        .respond(&["simctl", "list"], Response::stdout(simulator_list("Booted", "Shutdown")))
        .respond(&["plutil"], Response::stdout(BUNDLE_ID))
        .respond(&["simctl", "launch"], Response::stdout("launched\n"));

    let report = run(&runner, fast_config(), &ws.request(simulator(), false));

    let err = failure(&report);
    assert_eq!(err.kind(), FailureKind::State);
    assert!(err.to_string().contains("launch reported success"));
    assert_eq!(report.launch_history.last(), Some(&LaunchState::Failed));
}

#[test]
fn test_cancelled_run_exits_with_cancelled_code() {
    let ws = Workspace::with_app();
    let runner = simulator_runner();
    let ctx = context(&runner, fast_config());
    ctx.cancel.cancel();

    let report = Orchestrator::new(&ctx, &SilentProgress, &ManualSessionHost)
        .run(&ws.request(simulator(), false));

    assert_eq!(failure(&report).kind(), FailureKind::Cancelled);
    assert_eq!(report.completion.exit_code(), ExitCode::Cancelled);
    assert_eq!(runner.count(&["simctl", "install"]), 0);
}
