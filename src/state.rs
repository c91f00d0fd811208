//! Application context built once at startup and shared by every handler.

use std::sync::Arc;

use tracing::{error, info};

use crate::artifact::{self, Predictor};
use crate::config::AppConfig;

/// Outcome of loading the artifact. Fixed for the life of the process.
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<dyn Predictor>),
    Unavailable { reason: String },
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Loaded(_) => f.write_str("Loaded"),
            ModelState::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl ModelState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub model: ModelState,
}

impl AppContext {
    /// Loads the artifact named by `config`. A failed load is recorded,
    /// not returned.
    pub fn load(config: AppConfig) -> Self {
        let model = match artifact::load(&config.model_path) {
            Ok(predictor) => {
                info!(path = %config.model_path.display(), "Model loaded");
                ModelState::Loaded(Arc::from(predictor))
            }
            Err(e) => {
                error!(
                    path = %config.model_path.display(),
                    error = %e,
                    "Model failed to load, serving in degraded mode"
                );
                ModelState::Unavailable { reason: e.to_string() }
            }
        };
        Self { config, model }
    }

    pub fn with_predictor(config: AppConfig, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            config,
            model: ModelState::Loaded(predictor),
        }
    }

    pub fn unavailable(config: AppConfig, reason: impl Into<String>) -> Self {
        Self {
            config,
            model: ModelState::Unavailable { reason: reason.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_artifact_degrades_instead_of_failing() {
        let config = AppConfig {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            ..AppConfig::default()
        };
        let ctx = AppContext::load(config);
        assert!(!ctx.model.is_loaded());
        match ctx.model {
            ModelState::Unavailable { reason } => {
                assert!(reason.contains("/nonexistent/model.onnx"))
            }
            ModelState::Loaded(_) => panic!("expected degraded state"),
        }
    }
}
