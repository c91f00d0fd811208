//! The fixed feature set and the presence check shared by both input shapes.

use serde_json::{Map, Value};

/// How the artifact expects a feature's column to be typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub name: &'static str,
    pub kind: FeatureKind,
}

/// Canonical column order handed to the artifact.
pub const FEATURES: [Feature; 6] = [
    Feature {
        name: "age",
        kind: FeatureKind::Numeric,
    },
    Feature {
        name: "sex",
        kind: FeatureKind::Categorical,
    },
    Feature {
        name: "bmi",
        kind: FeatureKind::Numeric,
    },
    Feature {
        name: "children",
        kind: FeatureKind::Numeric,
    },
    Feature {
        name: "smoker",
        kind: FeatureKind::Categorical,
    },
    Feature {
        name: "region",
        kind: FeatureKind::Categorical,
    },
];

pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURES.iter().map(|f| f.name)
}

/// Required feature names absent from `supplied`, in canonical order.
///
/// `supplied` is whatever names the caller has: JSON keys for a single
/// record, header fields for a CSV table.
pub fn missing_features<'a, I>(supplied: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let supplied: Vec<&str> = supplied.into_iter().collect();
    feature_names()
        .filter(|name| !supplied.contains(name))
        .collect()
}

/// Rows of cells in canonical feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<Vec<Value>>,
}

impl FeatureTable {
    /// One-row table from a record. Caller has already checked presence;
    /// an absent key becomes a null cell.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let row = feature_names()
            .map(|name| record.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        Self { rows: vec![row] }
    }

    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == FEATURES.len()));
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Cells of one feature column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nothing_missing_when_all_supplied_in_any_order() {
        let keys = ["region", "smoker", "children", "bmi", "sex", "age", "extra"];
        assert!(missing_features(keys).is_empty());
    }

    #[test]
    fn missing_reported_in_canonical_order() {
        assert_eq!(missing_features(["smoker", "age"]), vec!["sex", "bmi", "children", "region"]);
        assert_eq!(missing_features(std::iter::empty()), feature_names().collect::<Vec<_>>());
    }

    #[test]
    fn record_is_reordered_into_canonical_columns() {
        let record = json!({
            "region": "southwest",
            "smoker": "yes",
            "children": 0,
            "bmi": 27.9,
            "sex": "female",
            "age": 19,
            "ignored": true
        });
        let table = FeatureTable::from_record(record.as_object().unwrap());
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows()[0],
            vec![
                json!(19),
                json!("female"),
                json!(27.9),
                json!(0),
                json!("yes"),
                json!("southwest")
            ]
        );
        assert_eq!(table.column(4).collect::<Vec<_>>(), vec![&json!("yes")]);
    }
}
