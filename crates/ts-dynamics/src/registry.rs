//! Explicit model-type -> plugin table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{DynamicsError, DynamicsResult};
use crate::linear_tank::LinearTankPlugin;
use crate::plugin::DynamicsPlugin;
use crate::tank::TankPlugin;

/// Resolves a model-type identifier to a shared plugin instance.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn DynamicsPlugin>>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every plugin shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for plugin in [
            Arc::new(TankPlugin) as Arc<dyn DynamicsPlugin>,
            Arc::new(LinearTankPlugin),
        ] {
            registry.plugins.insert(plugin.model_type().to_string(), plugin);
        }
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn DynamicsPlugin>) -> DynamicsResult<()> {
        let model_type = plugin.model_type().to_string();
        if self.plugins.contains_key(&model_type) {
            return Err(DynamicsError::DuplicatePlugin { model_type });
        }
        debug!(model_type = %model_type, "plugin registered");
        self.plugins.insert(model_type, plugin);
        Ok(())
    }

    pub fn resolve(&self, model_type: &str) -> DynamicsResult<Arc<dyn DynamicsPlugin>> {
        match self.plugins.get(model_type) {
            Some(plugin) => Ok(Arc::clone(plugin)),
            None => {
                let available = self.model_types();
                error!(model_type, ?available, "no plugin for model type");
                Err(DynamicsError::UnknownModelType {
                    model_type: model_type.to_string(),
                    available,
                })
            }
        }
    }

    /// Registered model types, sorted.
    pub fn model_types(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }
}
