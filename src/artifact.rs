//! Loading the prediction artifact and the capability it exposes.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde_json::Value;
use thiserror::Error;
use tract_core::prelude::{DatumType, Tensor};
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::features::{FeatureKind, FeatureTable, FEATURES};

/// Maps a fixed-column feature table to one cost estimate per row.
pub trait Predictor: Send + Sync {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, PredictError>;
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{0}: No such file or directory")]
    NotFound(PathBuf),

    #[error("unsupported artifact format: {0} (expected an .onnx file)")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read model graph: {0}")]
    Graph(String),

    #[error("model graph declares {found} inputs, expected one per feature ({expected})")]
    InputCount { expected: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("invalid value for '{feature}' in row {row}: {reason}")]
    InvalidValue {
        feature: &'static str,
        row: usize,
        reason: String,
    },

    #[error("model returned {got} values for {expected} rows")]
    OutputLength { expected: usize, got: usize },

    #[error("model returned a non-finite value for row {row}")]
    NonFinite { row: usize },

    #[error("{0}")]
    Runtime(String),
}

/// Loads the artifact at `path`. The format is picked from the extension.
pub fn load(path: &Path) -> Result<Box<dyn Predictor>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("onnx") => Ok(Box::new(OnnxPipeline::load(path)?)),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Which feature column feeds a graph input, and as what type.
#[derive(Debug, Clone, Copy)]
struct InputBinding {
    feature: usize,
    datum_type: DatumType,
}

/// An exported tabular pipeline run through tract.
///
/// The graph takes one `[N, 1]` input per feature and produces the
/// estimates as its first output.
pub struct OnnxPipeline {
    plan: TypedRunnableModel<TypedModel>,
    bindings: Vec<InputBinding>,
}

impl OnnxPipeline {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| LoadError::Graph(format!("{e:#}")))?;

        let bindings = bind_inputs(plan.model())?;
        info!(
            path = %path.display(),
            inputs = bindings.len(),
            "ONNX pipeline ready"
        );
        Ok(Self { plan, bindings })
    }

    fn column_tensor(
        &self,
        table: &FeatureTable,
        binding: InputBinding,
    ) -> Result<Tensor, PredictError> {
        let feature = &FEATURES[binding.feature];
        let rows = table.len();

        let tensor = match feature.kind {
            FeatureKind::Numeric => {
                let values = table
                    .column(binding.feature)
                    .enumerate()
                    .map(|(row, cell)| {
                        numeric_cell(cell).map_err(|reason| invalid(feature.name, row, reason))
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                let column = Array2::from_shape_vec((rows, 1), values)
                    .map_err(|e| PredictError::Runtime(e.to_string()))?;
                let tensor = Tensor::from(column);
                tensor
                    .cast_to_dt(binding.datum_type)
                    .map_err(|e| PredictError::Runtime(format!("{e:#}")))?
                    .into_owned()
            }
            FeatureKind::Categorical => {
                let values = table
                    .column(binding.feature)
                    .enumerate()
                    .map(|(row, cell)| {
                        categorical_cell(cell).map_err(|reason| invalid(feature.name, row, reason))
                    })
                    .collect::<Result<Vec<String>, _>>()?;
                let column = Array2::from_shape_vec((rows, 1), values)
                    .map_err(|e| PredictError::Runtime(e.to_string()))?;
                Tensor::from(column)
            }
        };
        Ok(tensor)
    }
}

impl Predictor for OnnxPipeline {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, PredictError> {
        let inputs = self
            .bindings
            .iter()
            .map(|binding| self.column_tensor(table, *binding).map(|t| t.into()))
            .collect::<Result<TVec<_>, _>>()?;

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| PredictError::Runtime(format!("{e:#}")))?;
        let first = outputs
            .first()
            .ok_or_else(|| PredictError::Runtime("model produced no outputs".to_string()))?;
        let values = first
            .cast_to::<f64>()
            .and_then(|t| Ok(t.as_slice::<f64>()?.to_vec()))
            .map_err(|e| PredictError::Runtime(format!("{e:#}")))?;

        debug!(rows = table.len(), "ONNX pipeline run");
        Ok(values)
    }
}

fn bind_inputs(model: &TypedModel) -> Result<Vec<InputBinding>, LoadError> {
    let found = model.inputs.len();
    if found != FEATURES.len() {
        return Err(LoadError::InputCount {
            expected: FEATURES.len(),
            found,
        });
    }

    let names: Vec<&str> = model
        .inputs
        .iter()
        .map(|outlet| model.node(outlet.node).name.as_str())
        .collect();
    let features = assign_features(&names)?;

    features
        .into_iter()
        .enumerate()
        .map(|(input, feature)| {
            let fact = model
                .input_fact(input)
                .map_err(|e| LoadError::Graph(format!("{e:#}")))?;
            Ok(InputBinding {
                feature,
                datum_type: fact.datum_type,
            })
        })
        .collect()
}

/// Feature column for each graph input, in input order.
///
/// Inputs named after a feature take that feature. The rest take the
/// features left over, in canonical order.
fn assign_features(names: &[&str]) -> Result<Vec<usize>, LoadError> {
    let by_name: Vec<Option<usize>> = names
        .iter()
        .map(|name| FEATURES.iter().position(|f| f.name == *name))
        .collect();

    let mut taken = [false; FEATURES.len()];
    for feature in by_name.iter().flatten() {
        if taken[*feature] {
            return Err(LoadError::Graph(format!(
                "feature '{}' is bound to more than one graph input",
                FEATURES[*feature].name
            )));
        }
        taken[*feature] = true;
    }

    let mut leftover = (0..FEATURES.len()).filter(|i| !taken[*i]);
    by_name
        .into_iter()
        .map(|feature| {
            feature
                .or_else(|| leftover.next())
                .ok_or_else(|| LoadError::Graph("more graph inputs than features".to_string()))
        })
        .collect()
}

fn invalid(feature: &'static str, row: usize, reason: String) -> PredictError {
    PredictError::InvalidValue { feature, row, reason }
}

fn numeric_cell(cell: &Value) -> Result<f64, String> {
    match cell {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{n} is not representable as a float")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert string to float: '{s}'")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Err("missing value".to_string()),
        other => Err(format!("expected a number, got {other}")),
    }
}

fn categorical_cell(cell: &Value) -> Result<String, String> {
    match cell {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err("missing value".to_string()),
        other => Err(format!("expected a category label, got {other}")),
    }
}
