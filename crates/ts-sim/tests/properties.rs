use proptest::prelude::*;
use ts_attacks::{AttackKind, AttackRecord};
use ts_core::step_count;
use ts_dynamics::PluginRegistry;
use ts_model::{ControllerConfig, IntegrationMethod, ModelDefinition};
use ts_sim::{
    Collaborators, MemoryTelemetry, NoPacing, RunStatus, SimOptions, Simulator, StatusLog,
    TelemetryRecord,
};

fn tank(method: IntegrationMethod, dt: f64, duration: f64, level: f64) -> ModelDefinition {
    ModelDefinition::new("tank-1", "tank")
        .with_solver(method, dt, duration)
        .with_initial("level", level)
        .with_controller(ControllerConfig {
            setpoint: 5.0,
            ..ControllerConfig::default()
        })
}

fn run(model: ModelDefinition, attacks: Vec<AttackRecord>) -> (RunStatus, u64, Vec<TelemetryRecord>) {
    let registry = PluginRegistry::with_builtin();
    let mut statuses = StatusLog::default();
    let mut telemetry = MemoryTelemetry::default();
    let report = {
        let mut collab = Collaborators {
            attacks: &attacks,
            status: &mut statuses,
            telemetry: &mut telemetry,
        };
        let mut sim =
            Simulator::initialize("run-p", model, &registry, SimOptions { seed: 7 }, &mut collab)
                .unwrap();
        sim.run(&mut collab, &mut NoPacing, None).unwrap()
    };
    (report.status, report.steps, telemetry.records)
}

#[test]
fn telemetry_lines_survive_json() {
    let fdi = AttackRecord::new("fdi", AttackKind::FalseDataInjection, "tank.level_sensor", 0.3)
        .with_param("false_value", 7.25);
    let (_, _, records) = run(tank(IntegrationMethod::Rk4, 0.1, 1.0, 3.3), vec![fdi]);

    for record in &records {
        let line = serde_json::to_string(record).unwrap();
        assert!(!line.contains('\n'));
        let back: TelemetryRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(&back, record);
    }
    assert!(records.iter().any(|r| r.is_attacked("tank.level_sensor")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn unattacked_runs_observe_ground_truth(
        dt in 0.01f64..0.5,
        duration in 0.1f64..5.0,
        level in 0.0f64..9.0,
        rk4 in any::<bool>(),
    ) {
        let method = if rk4 { IntegrationMethod::Rk4 } else { IntegrationMethod::Euler };
        let (status, steps, records) = run(tank(method, dt, duration, level), Vec::new());

        prop_assert_eq!(status, RunStatus::Completed);
        prop_assert_eq!(steps, step_count(duration, dt).unwrap());
        prop_assert_eq!(records.len() as u64, steps);
        for record in &records {
            prop_assert_eq!(&record.observed_signals, &record.real_signals);
            prop_assert!(record.active_attacks.is_empty());
        }
    }
}
