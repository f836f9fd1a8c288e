//! Feature matrix construction and type validation
//!
//! Both the trainer and the predictor turn a [`FeatureFrame`] into a dense
//! numeric matrix through the same path: every declared-numeric feature must
//! be a numeric column (no silent coercion), and categorical features are
//! dictionary-encoded to discrete codes the tree learner consumes natively.

use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use polars::prelude::*;
use std::collections::HashMap;

/// Ordered feature list plus the subset declared categorical.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub features: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSet {
    /// The demand model's standard feature set.
    pub fn demand_default() -> Self {
        Self {
            features: [
                "market",
                "sku_id",
                "time_index",
                "sin_week",
                "cos_week",
                "price",
                "promo_flag",
                "holiday_flag",
                "temp_c",
                "rain_mm",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            categorical: ["market", "sku_id", "promo_flag", "holiday_flag"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }
}

/// Human-readable dtype name, used in type-validation errors.
fn type_name(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Float64 | DataType::Float32 => "float",
        DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => "int",
        DataType::Boolean => "bool",
        DataType::Utf8 => "str",
        _ => "other",
    }
}

/// Per-column dictionaries for string-valued categorical features.
///
/// Built once at training time from sorted distinct values so the codes are
/// deterministic, then reused at prediction. A value unseen at training maps
/// to missing rather than a fresh code.
#[derive(Debug, Clone, Default)]
pub struct CategoryVocab {
    codes: HashMap<String, HashMap<String, u32>>,
}

impl CategoryVocab {
    /// Build dictionaries for every string-typed categorical feature.
    pub fn build(frame: &FeatureFrame, set: &FeatureSet) -> Result<Self> {
        let mut codes = HashMap::new();
        for name in &set.categorical {
            let Ok(column) = frame.dataframe().column(name) else {
                continue;
            };
            if column.dtype() != &DataType::Utf8 {
                continue;
            }
            let mut distinct: Vec<&str> = column.utf8()?.into_iter().flatten().collect();
            distinct.sort_unstable();
            distinct.dedup();
            let map: HashMap<String, u32> = distinct
                .into_iter()
                .enumerate()
                .map(|(i, v)| (v.to_string(), i as u32))
                .collect();
            codes.insert(name.clone(), map);
        }
        Ok(Self { codes })
    }

    fn code(&self, column: &str, value: &str) -> Option<u32> {
        self.codes.get(column)?.get(value).copied()
    }
}

/// Dense column-major feature matrix. Missing cells are NaN; the tree
/// learner routes them through a per-split default direction.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub categorical: Vec<bool>,
    pub columns: Vec<Vec<f64>>,
    pub n_rows: usize,
}

impl FeatureMatrix {
    pub fn value(&self, feature: usize, row: usize) -> f64 {
        self.columns[feature][row]
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }
}

/// Build the matrix for the given feature set, validating types first.
///
/// Validation is fail-fast and names the offending column with its observed
/// type; it runs independently at train and predict time, so a fix between
/// stages is never assumed.
pub fn build_matrix(
    frame: &FeatureFrame,
    set: &FeatureSet,
    vocab: &CategoryVocab,
) -> Result<FeatureMatrix> {
    let n_rows = frame.len();
    let mut names = Vec::with_capacity(set.features.len());
    let mut categorical = Vec::with_capacity(set.features.len());
    let mut columns = Vec::with_capacity(set.features.len());

    for name in &set.features {
        let column = frame.dataframe().column(name).map_err(|_| {
            ForecastError::Validation(format!("Feature column {} not found in frame", name))
        })?;

        let is_cat = set.is_categorical(name);
        let values: Vec<f64> = match column.dtype() {
            DataType::Float64 => column
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect(),
            DataType::Int64 => column
                .i64()?
                .into_iter()
                .map(|v| v.map_or(f64::NAN, |i| i as f64))
                .collect(),
            DataType::Int32 => column
                .i32()?
                .into_iter()
                .map(|v| v.map_or(f64::NAN, |i| i as f64))
                .collect(),
            DataType::Boolean => column
                .bool()?
                .into_iter()
                .map(|v| v.map_or(f64::NAN, |b| b as i64 as f64))
                .collect(),
            DataType::Utf8 if is_cat => column
                .utf8()?
                .into_iter()
                .map(|v| match v {
                    Some(s) => vocab.code(name, s).map_or(f64::NAN, |code| code as f64),
                    None => f64::NAN,
                })
                .collect(),
            dtype => {
                return Err(ForecastError::DataType {
                    column: name.clone(),
                    observed: type_name(dtype).to_string(),
                })
            }
        };

        names.push(name.clone());
        categorical.push(is_cat);
        columns.push(values);
    }

    Ok(FeatureMatrix {
        names,
        categorical,
        columns,
        n_rows,
    })
}

/// Extract the demand labels from a training frame.
pub fn training_labels(frame: &FeatureFrame) -> Result<Vec<f64>> {
    frame
        .kinds()?
        .iter()
        .enumerate()
        .map(|(row, kind)| {
            kind.units().ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Training frame contains an unlabeled row at {}",
                    row
                ))
            })
        })
        .collect()
}
