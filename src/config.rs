//! Startup configuration.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Serve `POST /predict_batch`.
    pub batch_enabled: bool,
    /// Return raw predictor messages to clients instead of an error id.
    pub expose_error_details: bool,
    pub max_upload_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            model_path: PathBuf::from("best_pipeline.onnx"),
            batch_enabled: true,
            expose_error_details: false,
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "API_PORT", defaults.port),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            batch_enabled: flag(&lookup, "BATCH_ENABLED", defaults.batch_enabled),
            expose_error_details: flag(
                &lookup,
                "EXPOSE_ERROR_DETAILS",
                defaults.expose_error_details,
            ),
            max_upload_size: parsed(&lookup, "MAX_UPLOAD_SIZE", defaults.max_upload_size),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!(key, value = %v, fallback = default, "Ignoring unparsable flag");
            default
        }
        None => default,
    }
}
