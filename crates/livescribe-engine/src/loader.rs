use crate::model::{ModelAssets, SpeechModel};
use crate::registry::ModelRegistry;
use livescribe_core::{ModelConfig, ModelError};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves model and scorer names under a models directory and loads them
/// through the configured backend.
pub struct ModelLoader {
    models_dir: PathBuf,
    backend: String,
    registry: ModelRegistry,
}

impl ModelLoader {
    pub fn new(models_dir: impl Into<PathBuf>, backend: &str) -> Self {
        Self::with_registry(models_dir, backend, ModelRegistry::new())
    }

    pub fn with_registry(
        models_dir: impl Into<PathBuf>,
        backend: &str,
        registry: ModelRegistry,
    ) -> Self {
        Self {
            models_dir: models_dir.into(),
            backend: backend.to_string(),
            registry,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(&config.models_dir, &config.backend)
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Map names to paths and check that both assets exist.
    pub fn resolve(&self, model_name: &str, scorer_name: &str) -> Result<ModelAssets, ModelError> {
        if model_name.trim().is_empty() || scorer_name.trim().is_empty() {
            return Err(ModelError::BlankName);
        }

        let assets = ModelAssets {
            model_path: self.models_dir.join(model_name),
            scorer_path: self.models_dir.join(scorer_name),
        };

        for path in [&assets.model_path, &assets.scorer_path] {
            if !path.exists() {
                tracing::error!("model loading failed: {} does not exist", path.display());
                return Err(ModelError::AssetNotFound(path.clone()));
            }
        }

        Ok(assets)
    }

    pub fn load(
        &self,
        model_name: &str,
        scorer_name: &str,
    ) -> Result<Arc<dyn SpeechModel>, ModelError> {
        let assets = self.resolve(model_name, scorer_name)?;
        let model = self.registry.create(&self.backend, &assets)?;
        tracing::info!(
            backend = %self.backend,
            model = %model.name(),
            sample_rate = model.sample_rate(),
            "model loaded"
        );
        Ok(model)
    }
}
