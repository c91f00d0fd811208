//! HTTP service that predicts medical insurance cost from six
//! demographic and lifestyle features using a pre-trained artifact.

pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod server;
pub mod state;

pub use artifact::{LoadError, PredictError, Predictor};
pub use config::AppConfig;
pub use error::ApiError;
pub use features::{FeatureTable, FEATURES};
pub use server::{create_app, run_server};
pub use state::{AppContext, ModelState};
