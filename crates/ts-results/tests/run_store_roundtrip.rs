use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ts_core::SignalMap;
use ts_results::{ResultsError, RunManifest, RunStore};
use ts_sim::{RunStatus, TelemetryRecord, TelemetrySink};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn manifest(run_id: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        scenario_name: "baseline".to_string(),
        model_name: "tank-1".to_string(),
        model_type: "tank".to_string(),
        method: "rk4".to_string(),
        dt: 0.1,
        duration: 1.0,
        seed: 0,
        attack_count: 0,
        status: RunStatus::Completed,
        steps: 2,
        total_steps: 2,
        final_time: 0.2,
        attack_failures: 0,
        error: None,
        timestamp: timestamp.to_string(),
        fingerprint: "abc".to_string(),
        engine_version: "0.1.0".to_string(),
    }
}

fn record(t: f64, level: f64) -> TelemetryRecord {
    let signals = SignalMap::from([("tank.level_sensor".to_string(), level)]);
    TelemetryRecord {
        timestamp: t,
        real_signals: signals.clone(),
        observed_signals: signals,
        control_actions: Default::default(),
        active_attacks: Vec::new(),
    }
}

#[test]
fn save_list_load_roundtrip() {
    let root = unique_temp_dir("ts_results_store");
    let store = RunStore::new(root.clone()).expect("failed to create run store");

    let records = vec![record(0.0, 5.0), record(0.1, 5.1)];
    store
        .save_run(&manifest("run-b", "2026-02-26T00:00:01Z"), &records)
        .expect("failed to save run");
    store
        .save_run(&manifest("run-a", "2026-02-26T00:00:00Z"), &records[..1])
        .expect("failed to save run");

    let runs = store.list_runs().expect("failed to list runs");
    let ids: Vec<_> = runs.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run-a", "run-b"]);

    let loaded = store.load_manifest("run-b").expect("failed to load manifest");
    assert_eq!(loaded, manifest("run-b", "2026-02-26T00:00:01Z"));

    let loaded_records = store.load_telemetry("run-b").expect("failed to load records");
    assert_eq!(loaded_records, records);

    store.delete_run("run-a").unwrap();
    assert!(!store.has_run("run-a"));
    assert!(matches!(
        store.load_manifest("run-a"),
        Err(ResultsError::RunNotFound { .. })
    ));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn streaming_writer_appends_lines() {
    let root = unique_temp_dir("ts_results_stream");
    let store = RunStore::new(root.clone()).unwrap();

    let mut sink = store.telemetry_writer("run-s").unwrap();
    for i in 0..5 {
        sink.emit("run-s", &record(i as f64 * 0.1, 5.0 + i as f64))
            .unwrap();
    }
    assert_eq!(sink.finish().unwrap(), 5);
    store.save_manifest(&manifest("run-s", "2026-01-01T00:00:00Z")).unwrap();

    let loaded = store.load_telemetry("run-s").unwrap();
    assert_eq!(loaded.len(), 5);
    assert_eq!(loaded[4].real_signals["tank.level_sensor"], 9.0);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn path_like_run_ids_are_rejected() {
    let root = unique_temp_dir("ts_results_ids");
    let store = RunStore::new(root.clone()).unwrap();
    for bad in ["", "..", "a/b", "a\\b"] {
        assert!(matches!(
            store.load_manifest(bad),
            Err(ResultsError::InvalidRunId { .. })
        ));
    }
    let _ = fs::remove_dir_all(root);
}

#[test]
fn directories_without_manifest_are_skipped() {
    let root = unique_temp_dir("ts_results_skip");
    let store = RunStore::new(root.clone()).unwrap();
    fs::create_dir_all(root.join("partial")).unwrap();
    assert!(store.list_runs().unwrap().is_empty());
    let _ = fs::remove_dir_all(root);
}

#[test]
fn streamed_floats_read_back_exactly() {
    let root = unique_temp_dir("ts_results_floats");
    let store = RunStore::new(root.clone()).unwrap();

    let records: Vec<_> = (0..200)
        .map(|k| {
            let t = k as f64 * 0.1;
            record(t, 0.48922852636263403 + t)
        })
        .collect();
    let mut sink = store.telemetry_writer("run-f").unwrap();
    for r in &records {
        sink.emit("run-f", r).unwrap();
    }
    sink.finish().unwrap();

    let loaded = store.load_telemetry("run-f").unwrap();
    let mismatched = loaded.iter().zip(&records).filter(|(a, b)| a != b).count();
    assert_eq!(mismatched, 0);
    assert_eq!(loaded, records);

    let _ = fs::remove_dir_all(root);
}
