//! Forecast generation
//!
//! Applies the trained triple to the inference partition and assembles point
//! + interval records, clipping each output column at zero independently.
//! Because the three models are fit independently, `lower_90 <= forecast <=
//! upper_90` is best-effort: inversions are logged for review, never
//! corrected and never an error.

use crate::dataset::build_matrix;
use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use crate::trainer::TrainedEnsembles;
use chrono::NaiveDate;
use serde::Serialize;

/// One forecast output row with its echoed driver features.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRecord {
    pub market: String,
    pub sku_id: String,
    pub week_start: NaiveDate,
    pub forecast: f64,
    pub lower_90: f64,
    pub upper_90: f64,
    pub price: Option<f64>,
    pub promo_flag: Option<i64>,
    pub holiday_flag: Option<i64>,
    pub temp_c: Option<f64>,
    pub rain_mm: Option<f64>,
}

/// The full forecast table for one session.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSet {
    records: Vec<ForecastRecord>,
}

impl ForecastSet {
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the forecast table as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.records)
            .map_err(|e| ForecastError::Validation(format!("JSON serialization failed: {}", e)))
    }

    /// Indices of rows where the independently fit bounds inverted.
    pub fn interval_inversions(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.lower_90 > r.upper_90)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Predict the future partition with the trained triple.
///
/// Runs the same type validation as training, independently: a type fix
/// between stages is never assumed.
pub fn predict(models: &TrainedEnsembles, future: &FeatureFrame) -> Result<ForecastSet> {
    let matrix = build_matrix(future, &models.feature_set, &models.vocab)?;

    let forecast = models.mean.predict_matrix(&matrix);
    let lower = models.lower.predict_matrix(&matrix);
    let upper = models.upper.predict_matrix(&matrix);

    let markets = future.markets()?;
    let skus = future.skus()?;
    let weeks = future.weeks()?;
    let price = future.float_values("price")?;
    let promo_flag = future.int_values("promo_flag")?;
    let holiday_flag = future.int_values("holiday_flag")?;
    let temp_c = future.float_values("temp_c")?;
    let rain_mm = future.float_values("rain_mm")?;

    let mut records = Vec::with_capacity(future.len());
    for row in 0..future.len() {
        let week_start = weeks[row].ok_or_else(|| {
            ForecastError::DataIntegrity(format!("Missing week_start at inference row {}", row))
        })?;

        // Demand cannot be negative; each column clips independently.
        records.push(ForecastRecord {
            market: markets[row].clone(),
            sku_id: skus[row].clone(),
            week_start,
            forecast: forecast[row].max(0.0),
            lower_90: lower[row].max(0.0),
            upper_90: upper[row].max(0.0),
            price: price[row],
            promo_flag: promo_flag[row],
            holiday_flag: holiday_flag[row],
            temp_c: temp_c[row],
            rain_mm: rain_mm[row],
        });
    }

    let set = ForecastSet { records };
    let inversions = set.interval_inversions();
    if !inversions.is_empty() {
        log::warn!(
            "{} forecast rows have lower_90 > upper_90 (independent quantile fits); flagged for review",
            inversions.len()
        );
    }
    Ok(set)
}

/// Predict through an optional model triple, short-circuiting when training
/// did not produce models.
pub fn predict_opt(models: Option<&TrainedEnsembles>, future: &FeatureFrame) -> Result<ForecastSet> {
    let models = models.ok_or(ForecastError::ModelUnavailable)?;
    predict(models, future)
}
