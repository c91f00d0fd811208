//! Turns validated input into predictor calls and plain floats.

use serde_json::{Map, Value};
use tracing::{error, warn};
use uuid::Uuid;

use crate::artifact::{PredictError, Predictor};
use crate::batch::CsvBatch;
use crate::error::ApiError;
use crate::features::{missing_features, FeatureTable};
use crate::state::{AppContext, ModelState};

/// Runs the predictor, checking it returned one finite value per row.
pub fn run(predictor: &dyn Predictor, table: &FeatureTable) -> Result<Vec<f64>, PredictError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let values = predictor.predict(table)?;
    if values.len() != table.len() {
        return Err(PredictError::OutputLength {
            expected: table.len(),
            got: values.len(),
        });
    }
    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(PredictError::NonFinite { row });
    }
    Ok(values)
}

impl AppContext {
    fn predictor(&self) -> Result<&dyn Predictor, ApiError> {
        match &self.model {
            ModelState::Loaded(predictor) => Ok(predictor.as_ref()),
            ModelState::Unavailable { reason } => Err(ApiError::ModelUnavailable(reason.clone())),
        }
    }

    fn prediction_failed(&self, e: PredictError) -> ApiError {
        if self.config.expose_error_details {
            warn!(error = %e, "Prediction failed");
            ApiError::Prediction(e.to_string())
        } else {
            let id = Uuid::new_v4();
            error!(error_id = %id, error = %e, "Prediction failed");
            ApiError::PredictionRedacted(id)
        }
    }

    /// Single-record prediction.
    pub fn predict_record(&self, record: &Map<String, Value>) -> Result<f64, ApiError> {
        let predictor = self.predictor()?;

        let missing = missing_features(record.keys().map(String::as_str));
        if !missing.is_empty() {
            return Err(ApiError::missing_features(missing));
        }

        let table = FeatureTable::from_record(record);
        let values = run(predictor, &table).map_err(|e| self.prediction_failed(e))?;
        values
            .first()
            .copied()
            .ok_or_else(|| ApiError::Internal("predictor returned no value".to_string()))
    }

    /// Batch prediction; returns the uploaded table with `predicted_cost`
    /// appended, serialized as CSV.
    pub fn predict_csv(&self, data: &[u8]) -> Result<Vec<u8>, ApiError> {
        let predictor = self.predictor()?;

        let batch = CsvBatch::parse(data)?;
        let table = batch.feature_table()?;
        let values = run(predictor, &table).map_err(|e| self.prediction_failed(e))?;
        batch.with_predictions(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;
    use std::sync::Arc;

    struct Fixed(Vec<f64>);

    impl Predictor for Fixed {
        fn predict(&self, _table: &FeatureTable) -> Result<Vec<f64>, PredictError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl Predictor for Failing {
        fn predict(&self, _table: &FeatureTable) -> Result<Vec<f64>, PredictError> {
            Err(PredictError::Runtime("secret internal path /opt/model".to_string()))
        }
    }

    fn record() -> Map<String, Value> {
        json!({
            "age": 19,
            "sex": "female",
            "bmi": 27.9,
            "children": 0,
            "smoker": "yes",
            "region": "southwest"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn wrong_output_length_is_an_error() {
        let table = FeatureTable::from_record(&record());
        let err = run(&Fixed(vec![1.0, 2.0]), &table).unwrap_err();
        assert!(matches!(err, PredictError::OutputLength { expected: 1, got: 2 }));
    }

    #[test]
    fn empty_table_skips_the_predictor() {
        let table = FeatureTable::from_rows(Vec::new());
        assert_eq!(run(&Fixed(vec![1.0]), &table).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn non_finite_output_is_an_error() {
        let table = FeatureTable::from_record(&record());
        let err = run(&Fixed(vec![f64::NAN]), &table).unwrap_err();
        assert!(matches!(err, PredictError::NonFinite { row: 0 }));
    }

    #[test]
    fn unavailable_model_wins_over_validation() {
        let ctx = AppContext::unavailable(AppConfig::default(), "boom");
        let err = ctx.predict_record(&Map::new()).unwrap_err();
        assert!(matches!(err, ApiError::ModelUnavailable(_)));
    }

    #[test]
    fn failures_are_redacted_unless_configured() {
        let ctx = AppContext::with_predictor(AppConfig::default(), Arc::new(Failing));
        let err = ctx.predict_record(&record()).unwrap_err();
        assert!(matches!(err, ApiError::PredictionRedacted(_)));
        assert!(!err.to_string().contains("/opt/model"));

        let config = AppConfig {
            expose_error_details: true,
            ..AppConfig::default()
        };
        let ctx = AppContext::with_predictor(config, Arc::new(Failing));
        let err = ctx.predict_record(&record()).unwrap_err();
        assert_eq!(err.to_string(), "Prediction failed: secret internal path /opt/model");
    }
}
