//! Integration tests for run execution, persistence and concurrent runs.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ts_app::{
    AppError, PROGRESS_BUFFER, RunOptions, RunProgressEvent, RunRequest, RunStage, SeriesKind, execute_run,
    execute_run_with_progress, extract_signal_series, get_run_summary, list_runs, load_run,
    spawn_run,
};
use ts_attacks::{AttackKind, AttackRecord};
use ts_model::{ControllerConfig, IntegrationMethod, LATEST_VERSION, ModelDefinition, Scenario};
use ts_results::RunStore;
use ts_sim::RunStatus;

const LEVEL: &str = "tank.level_sensor";

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn scenario(duration: f64, attacks: Vec<AttackRecord>) -> Scenario {
    Scenario {
        version: LATEST_VERSION,
        name: "tank-under-attack".to_string(),
        model: ModelDefinition::new("tank-1", "tank")
            .with_solver(IntegrationMethod::Rk4, 0.1, duration)
            .with_initial("level", 4.0)
            .with_controller(ControllerConfig {
                setpoint: 5.0,
                ..ControllerConfig::default()
            }),
        attacks,
    }
}

fn paced(run_id: &str) -> RunOptions {
    RunOptions {
        pacing: Some(Duration::from_millis(5)),
        run_id: Some(run_id.to_string()),
        ..RunOptions::default()
    }
}

#[test]
fn progress_stages_are_reported_in_order() {
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let request = RunRequest::new(scenario(1.0, Vec::new()));
    let response = execute_run_with_progress(request, Some(&mut |e| events.push(e)))
        .expect("run should succeed");

    assert_eq!(response.report.status, RunStatus::Completed);
    assert_eq!(events.first().map(|e| e.stage), Some(RunStage::LoadingScenario));
    assert_eq!(events.last().map(|e| e.stage), Some(RunStage::Completed));

    let step_events: Vec<_> = events.iter().filter_map(|e| e.simulation).collect();
    assert_eq!(step_events.len(), 10);
    assert_eq!(step_events.last().map(|p| p.step), Some(10));
    assert!(
        step_events
            .windows(2)
            .all(|w| w[1].fraction_complete >= w[0].fraction_complete)
    );
    assert!(events.iter().all(|e| e.run_id == response.run_id));
}

#[test]
fn run_persists_manifest_and_telemetry() {
    let root = unique_temp_dir("ts_app_persist");
    let store = RunStore::new(root.clone()).expect("store");
    let dos = AttackRecord::new("dos-1", AttackKind::DenyOfService, LEVEL, 1.0).with_duration(1.0);
    let request = RunRequest::new(scenario(3.0, vec![dos])).with_store(store);

    let response = execute_run(request).expect("run should succeed");
    assert_eq!(response.telemetry.len(), 30);

    let runs = list_runs(&root).expect("list");
    assert!(runs.iter().any(|m| m.run_id == response.run_id));

    let (manifest, records) = load_run(&root, &response.run_id).expect("load");
    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.steps, 30);
    assert_eq!(manifest.attack_count, 1);
    assert_eq!(manifest.fingerprint, response.manifest.fingerprint);
    assert_eq!(records, response.telemetry);

    let summary = get_run_summary(&records).expect("summary");
    assert_eq!(summary.attacked_steps, 10);
    assert_eq!(summary.attack_ids, vec!["dos-1".to_string()]);

    let observed = extract_signal_series(&records, LEVEL, SeriesKind::Observed).expect("series");
    assert!(
        observed
            .iter()
            .filter(|(t, _)| (1.0..2.0).contains(t))
            .all(|(_, v)| *v == 0.0)
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn failed_initialization_is_recorded() {
    let root = unique_temp_dir("ts_app_failed");
    let store = RunStore::new(root.clone()).expect("store");
    let mut bad = scenario(1.0, Vec::new());
    bad.model.model_type = "boiler".to_string();
    let request = RunRequest::new(bad)
        .with_options(RunOptions {
            run_id: Some("bad-run".to_string()),
            ..RunOptions::default()
        })
        .with_store(store);

    let err = execute_run(request).expect_err("unknown model type must fail");
    assert!(matches!(err, AppError::Simulation(_)));

    let (manifest, records) = load_run(&root, "bad-run").expect("failed run is stored");
    assert_eq!(manifest.status, RunStatus::Failed);
    assert!(manifest.error.is_some());
    assert!(records.is_empty());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn same_seed_gives_identical_noise() {
    let noise = AttackRecord::new("n", AttackKind::RandomNoise, LEVEL, 0.0).with_param("noise_std", 0.2);
    let options = RunOptions {
        seed: 42,
        ..RunOptions::default()
    };
    let a = execute_run(
        RunRequest::new(scenario(2.0, vec![noise.clone()])).with_options(options.clone()),
    )
    .expect("run a");
    let b = execute_run(RunRequest::new(scenario(2.0, vec![noise])).with_options(options))
        .expect("run b");

    assert_eq!(a.telemetry, b.telemetry);
    assert_eq!(a.manifest.fingerprint, b.manifest.fingerprint);
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn concurrent_runs_are_controlled_independently() {
    let a = spawn_run(RunRequest::new(scenario(10.0, Vec::new())).with_options(paced("run-a")))
        .expect("spawn a");
    let b = spawn_run(RunRequest::new(scenario(10.0, Vec::new())).with_options(paced("run-b")))
        .expect("spawn b");

    assert!(a.pause());
    assert!(b.stop());
    thread::sleep(Duration::from_millis(30));
    assert!(a.resume());

    let a = a.join().expect("run a");
    let b = b.join().expect("run b");

    assert_eq!(a.report.status, RunStatus::Completed);
    assert_eq!(a.report.steps, 100);
    assert_eq!(b.report.status, RunStatus::Stopped);
    assert!(b.report.steps < 100);
    assert_eq!(b.telemetry.len() as u64, b.report.steps);
}

#[test]
fn attack_armed_while_running_takes_effect() {
    let handle = spawn_run(RunRequest::new(scenario(1.0, Vec::new())).with_options(paced("run-arm")))
        .expect("spawn");
    handle.arm_attack(AttackRecord::new("live", AttackKind::DenyOfService, LEVEL, 0.0));
    let response = handle.join().expect("run");

    assert_eq!(response.report.status, RunStatus::Completed);
    let last = response.telemetry.last().expect("records");
    assert_eq!(last.observed_signals[LEVEL], 0.0);
    assert!(last.active_attacks.iter().any(|a| a.id == "live"));
}

#[test]
fn progress_is_streamed_from_worker() {
    let handle = spawn_run(RunRequest::new(scenario(0.5, Vec::new())).with_options(paced("run-progress")))
        .expect("spawn");
    let mut stages = Vec::new();
    while let Some(event) = handle.recv_progress() {
        stages.push(event.stage);
    }
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    handle.join().expect("run");
}

#[test]
fn undrained_progress_stays_bounded() {
    let options = RunOptions {
        run_id: Some("run-undrained".to_string()),
        ..RunOptions::default()
    };
    let handle =
        spawn_run(RunRequest::new(scenario(60.0, Vec::new())).with_options(options)).expect("spawn");
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(5));
    }

    let mut buffered = 0;
    while handle.try_progress().is_some() {
        buffered += 1;
    }
    assert_eq!(buffered, PROGRESS_BUFFER);

    let response = handle.join().expect("run");
    assert_eq!(response.report.status, RunStatus::Completed);
    assert_eq!(response.report.steps, 600);
}

#[test]
fn setpoint_change_reaches_running_controller() {
    let handle = spawn_run(
        RunRequest::new(scenario(1.0, Vec::new())).with_options(paced("run-setpoint")),
    )
    .expect("spawn");
    handle.set_setpoint(0.0);
    handle.reset_controller();
    let response = handle.join().expect("run");

    assert_eq!(response.report.status, RunStatus::Completed);
    let last = response.telemetry.last().expect("records");
    assert_eq!(last.control_actions["valve_in_target"], 0.0);
}
