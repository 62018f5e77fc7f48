use crate::model::{ModelAssets, SpeechModel};
use livescribe_core::ModelError;
use std::collections::HashMap;
use std::sync::Arc;

pub type ModelFactory = fn(&ModelAssets) -> Result<Arc<dyn SpeechModel>, ModelError>;

/// Maps backend names (`"null"`, `"vosk"`) to model constructors.
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

fn load_null(assets: &ModelAssets) -> Result<Arc<dyn SpeechModel>, ModelError> {
    Ok(Arc::new(crate::null_model::NullModel::from_assets(assets)))
}

#[cfg(feature = "vosk")]
fn load_vosk(assets: &ModelAssets) -> Result<Arc<dyn SpeechModel>, ModelError> {
    Ok(Arc::new(crate::vosk_model::VoskModel::load(assets)?))
}

impl ModelRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", load_null);
        #[cfg(feature = "vosk")]
        registry.register("vosk", load_vosk);
        registry
    }

    pub fn register(&mut self, name: &str, factory: ModelFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(
        &self,
        backend: &str,
        assets: &ModelAssets,
    ) -> Result<Arc<dyn SpeechModel>, ModelError> {
        let factory = self
            .factories
            .get(backend)
            .ok_or_else(|| ModelError::BackendNotFound(backend.to_string()))?;
        factory(assets)
    }

    pub fn contains(&self, backend: &str) -> bool {
        self.factories.contains_key(backend)
    }

    pub fn list_backends(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
