use crate::{config::ModelConfig, error::ModelError};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::{path::PathBuf, sync::Mutex};

/// Owns the one-time deserialization of the classifier artifact.
///
/// The session is loaded on first use and cached for the lifetime of the
/// process; concurrent first callers race on a single initialization and all
/// observe the same handle. A failed attempt is not cached, so a later call
/// re-resolves the path. Inference needs `&mut Session`, hence the `Mutex`:
/// only the forward pass is serialized, never preprocessing.
pub struct ModelLoader {
    model_path: PathBuf,
    session: OnceCell<Mutex<Session>>,
}

impl ModelLoader {
    pub fn new(model_config: &ModelConfig) -> Self {
        Self {
            model_path: model_config.get_path(),
            session: OnceCell::new(),
        }
    }

    pub fn ensure_loaded(&self) -> Result<&Mutex<Session>, ModelError> {
        self.session.get_or_try_init(|| {
            if !self.model_path.exists() {
                return Err(ModelError::NotFound(self.model_path.clone()));
            }

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(ort::Error::from)?
                .commit_from_file(&self.model_path)?;

            tracing::info!("Loaded model from {}", self.model_path.display());
            Ok(Mutex::new(session))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_model_loader() -> ModelLoader {
        ModelLoader::new(&ModelConfig {
            onnx_file: "does_not_exist.onnx".to_string(),
            model_dir: PathBuf::from("/nonexistent"),
        })
    }

    #[test]
    fn test_missing_model_file_reports_path() {
        let loader = missing_model_loader();

        let err = loader.ensure_loaded().unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
        assert!(err.to_string().contains("does_not_exist.onnx"));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let loader = missing_model_loader();

        assert!(loader.ensure_loaded().is_err());
        // The cell must stay empty so the next call retries the load.
        assert!(loader.ensure_loaded().is_err());
    }
}
