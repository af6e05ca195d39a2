//! Scenario loading and inspection.

use std::path::Path;

use ts_attacks::AttackRecord;
use ts_core::step_count;
use ts_dynamics::PluginRegistry;
use ts_model::{Scenario, validate_scenario};

use crate::error::{AppError, AppResult};

/// Load a scenario file (YAML or JSON). The loader validates it.
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    ts_model::load_scenario(path).map_err(|e| AppError::ScenarioLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a standalone attack plan file.
pub fn load_attack_plan(path: &Path) -> AppResult<Vec<AttackRecord>> {
    let plan = ts_model::load_attack_plan(path).map_err(|e| AppError::ScenarioLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(plan.attacks)
}

pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    validate_scenario(scenario)?;
    ts_model::save_scenario(path, scenario).map_err(|e| AppError::ScenarioSave {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// What a scenario will run, after plugin-level checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub name: String,
    pub model_name: String,
    pub model_type: String,
    pub method: String,
    pub dt: f64,
    pub duration: f64,
    pub steps: u64,
    pub controller: String,
    pub attack_count: usize,
}

/// Check the scenario against the registry and describe it.
pub fn summarize_scenario(scenario: &Scenario, registry: &PluginRegistry) -> AppResult<ScenarioSummary> {
    validate_scenario(scenario)?;
    let model = &scenario.model;
    let plugin = registry.resolve(&model.model_type)?;
    plugin.validate(model)?;

    let steps = step_count(model.simulation.duration, model.simulation.dt)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let controller = match &model.controller {
        Some(cfg) => format!("{:?}", cfg.kind).to_lowercase(),
        None => "manual".to_string(),
    };

    Ok(ScenarioSummary {
        name: scenario.name.clone(),
        model_name: model.name.clone(),
        model_type: model.model_type.clone(),
        method: model.simulation.method.as_str().to_string(),
        dt: model.simulation.dt,
        duration: model.simulation.duration,
        steps,
        controller,
        attack_count: scenario.attacks.len(),
    })
}

pub fn list_model_types(registry: &PluginRegistry) -> Vec<String> {
    registry.model_types()
}
