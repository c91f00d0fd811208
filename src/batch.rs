//! CSV tables for batch prediction.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde_json::{Number, Value};

use crate::error::ApiError;
use crate::features::{feature_names, missing_features, FeatureTable};

pub const PREDICTION_COLUMN: &str = "predicted_cost";

/// An uploaded table, kept verbatim so it can be echoed back.
#[derive(Debug, Clone)]
pub struct CsvBatch {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl CsvBatch {
    pub fn parse(data: &[u8]) -> Result<Self, ApiError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(data);
        let headers = reader
            .headers()
            .map_err(|e| ApiError::MalformedCsv(e.to_string()))?
            .clone();
        if headers.is_empty() {
            return Err(ApiError::MalformedCsv("No columns to parse from file".to_string()));
        }
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::MalformedCsv(e.to_string()))?;
        Ok(Self { headers, records })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks the header and selects the feature columns in canonical order.
    pub fn feature_table(&self) -> Result<FeatureTable, ApiError> {
        let missing = missing_features(self.headers.iter());
        if !missing.is_empty() {
            return Err(ApiError::missing_columns(missing));
        }
        if self.is_empty() {
            return Err(ApiError::MalformedCsv("CSV contains no data rows".to_string()));
        }

        let positions: Vec<usize> = feature_names()
            .filter_map(|name| self.headers.iter().position(|h| h == name))
            .collect();
        let rows = self
            .records
            .iter()
            .map(|record| positions.iter().map(|&i| cell(&record[i])).collect())
            .collect();
        Ok(FeatureTable::from_rows(rows))
    }

    /// The original table with one prediction appended to every row.
    pub fn with_predictions(&self, predictions: &[f64]) -> Result<Vec<u8>, ApiError> {
        if predictions.len() != self.records.len() {
            return Err(ApiError::Internal(format!(
                "{} predictions for {} rows",
                predictions.len(),
                self.records.len()
            )));
        }

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        let write_err = |e: csv::Error| ApiError::Internal(e.to_string());

        let mut header = self.headers.clone();
        header.push_field(PREDICTION_COLUMN);
        writer.write_record(&header).map_err(write_err)?;

        for (record, prediction) in self.records.iter().zip(predictions) {
            let mut row = record.clone();
            row.push_field(&prediction.to_string());
            writer.write_record(&row).map_err(write_err)?;
        }

        writer
            .into_inner()
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

/// Reads a CSV cell the way a dataframe loader would: empty is null,
/// numeric text is a number, anything else stays text.
fn cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
