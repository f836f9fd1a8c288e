//! Model and forecast diagnostics
//!
//! Pure reads over trained models and predictions, consumed by the external
//! reporting layer: driver attribution from gain importance, the weekly
//! uncertainty-width series, shock impact summaries and per-market totals.

use crate::gbdt::Booster;
use crate::predict::ForecastSet;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many drivers the attribution ranking keeps.
pub const TOP_DRIVERS: usize = 15;

/// Features ranked by the mean model's gain importance, descending; top 15
/// with raw (not normalized) gain scores.
pub fn driver_attribution(model: &Booster) -> Vec<(String, f64)> {
    let mut ranked = model.feature_importance();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(TOP_DRIVERS);
    ranked
}

/// Weekly market-level aggregate of forecast and interval bounds.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyUncertainty {
    pub week_start: NaiveDate,
    pub mean_forecast: f64,
    pub mean_lower: f64,
    pub mean_upper: f64,
    /// `mean_upper - mean_lower`: width of the averaged interval.
    pub width: f64,
}

/// Per-week average of forecast, lower and upper across all SKUs of one
/// market, with the resulting interval width. An aggregate diagnostic, not
/// per-SKU.
pub fn uncertainty_width(set: &ForecastSet, market: &str) -> Vec<WeeklyUncertainty> {
    let mut grouped: BTreeMap<NaiveDate, (f64, f64, f64, usize)> = BTreeMap::new();
    for record in set.records().iter().filter(|r| r.market == market) {
        let entry = grouped.entry(record.week_start).or_insert((0.0, 0.0, 0.0, 0));
        entry.0 += record.forecast;
        entry.1 += record.lower_90;
        entry.2 += record.upper_90;
        entry.3 += 1;
    }

    grouped
        .into_iter()
        .map(|(week_start, (f, l, u, n))| {
            let n = n as f64;
            let mean_lower = l / n;
            let mean_upper = u / n;
            WeeklyUncertainty {
                week_start,
                mean_forecast: f / n,
                mean_lower,
                mean_upper,
                width: mean_upper - mean_lower,
            }
        })
        .collect()
}

/// Demand shock classification of a forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ShockType {
    Normal,
    Promo,
    Holiday,
    PromoHoliday,
}

impl ShockType {
    fn classify(promo: Option<i64>, holiday: Option<i64>) -> Self {
        match (promo == Some(1), holiday == Some(1)) {
            (true, true) => ShockType::PromoHoliday,
            (true, false) => ShockType::Promo,
            (false, true) => ShockType::Holiday,
            (false, false) => ShockType::Normal,
        }
    }
}

/// Forecast mean, spread and row count for one shock type.
#[derive(Debug, Clone, Serialize)]
pub struct ShockSummary {
    pub shock: ShockType,
    pub mean_forecast: f64,
    /// Sample standard deviation; `None` for single-row groups.
    pub std_forecast: Option<f64>,
    pub count: usize,
}

/// Average forecast grouped by shock type (promo/holiday combinations) for a
/// market and SKU selection. An empty SKU slice selects every SKU.
pub fn shock_summary(set: &ForecastSet, market: &str, skus: &[String]) -> Vec<ShockSummary> {
    let mut grouped: BTreeMap<ShockType, Vec<f64>> = BTreeMap::new();
    for record in set.records() {
        if record.market != market {
            continue;
        }
        if !skus.is_empty() && !skus.contains(&record.sku_id) {
            continue;
        }
        grouped
            .entry(ShockType::classify(record.promo_flag, record.holiday_flag))
            .or_default()
            .push(record.forecast);
    }

    grouped
        .into_iter()
        .map(|(shock, values)| {
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            let std_forecast = if count > 1 {
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / (count - 1) as f64;
                Some(variance.sqrt())
            } else {
                None
            };
            ShockSummary {
                shock,
                mean_forecast: mean,
                std_forecast,
                count,
            }
        })
        .collect()
}

/// Number of bins per axis of the weather impact grid.
pub const WEATHER_BINS: usize = 5;

/// Mean forecast over a temperature x rain grid for one market.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherImpact {
    /// Bin edges over the observed temperature range, `WEATHER_BINS + 1` long.
    pub temp_edges: Vec<f64>,
    /// Bin edges over the observed rain range, `WEATHER_BINS + 1` long.
    pub rain_edges: Vec<f64>,
    /// `mean_forecast[temp_bin][rain_bin]`; `None` for empty cells.
    pub mean_forecast: Vec<Vec<Option<f64>>>,
}

/// Average forecast binned over equal-width temperature and rain intervals
/// for one market. Rows missing either weather value are skipped; an empty
/// selection yields `None`.
pub fn weather_impact(set: &ForecastSet, market: &str) -> Option<WeatherImpact> {
    let rows: Vec<(f64, f64, f64)> = set
        .records()
        .iter()
        .filter(|r| r.market == market)
        .filter_map(|r| match (r.temp_c, r.rain_mm) {
            (Some(temp), Some(rain)) => Some((temp, rain, r.forecast)),
            _ => None,
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let temp_edges = bin_edges(rows.iter().map(|&(t, _, _)| t));
    let rain_edges = bin_edges(rows.iter().map(|&(_, r, _)| r));

    let mut sums = vec![vec![(0.0, 0usize); WEATHER_BINS]; WEATHER_BINS];
    for &(temp, rain, forecast) in &rows {
        let ti = bin_of(temp, &temp_edges);
        let ri = bin_of(rain, &rain_edges);
        sums[ti][ri].0 += forecast;
        sums[ti][ri].1 += 1;
    }

    let mean_forecast = sums
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(sum, n)| if n > 0 { Some(sum / n as f64) } else { None })
                .collect()
        })
        .collect();

    Some(WeatherImpact {
        temp_edges,
        rain_edges,
        mean_forecast,
    })
}

/// Equal-width bin edges over the observed value range.
fn bin_edges(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        min = min.min(value);
        max = max.max(value);
    }
    let width = (max - min) / WEATHER_BINS as f64;
    (0..=WEATHER_BINS).map(|i| min + width * i as f64).collect()
}

/// Index of the bin containing `value`; the last bin is closed on both ends.
fn bin_of(value: f64, edges: &[f64]) -> usize {
    let (min, max) = (edges[0], edges[edges.len() - 1]);
    if max <= min {
        return 0;
    }
    let raw = ((value - min) / (max - min) * WEATHER_BINS as f64) as usize;
    raw.min(WEATHER_BINS - 1)
}

/// Headline statistics for one market's forecast horizon.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub total_forecast: f64,
    pub avg_weekly_demand: f64,
    pub avg_uncertainty_width: f64,
    pub promo_weeks: usize,
}

/// Totals and averages over every forecast row of one market.
pub fn market_summary(set: &ForecastSet, market: &str) -> MarketSummary {
    let rows: Vec<_> = set
        .records()
        .iter()
        .filter(|r| r.market == market)
        .collect();
    if rows.is_empty() {
        return MarketSummary {
            total_forecast: 0.0,
            avg_weekly_demand: 0.0,
            avg_uncertainty_width: 0.0,
            promo_weeks: 0,
        };
    }

    let n = rows.len() as f64;
    let total: f64 = rows.iter().map(|r| r.forecast).sum();
    let width: f64 = rows.iter().map(|r| r.upper_90 - r.lower_90).sum();
    let promo_weeks = rows.iter().filter(|r| r.promo_flag == Some(1)).count();

    MarketSummary {
        total_forecast: total,
        avg_weekly_demand: total / n,
        avg_uncertainty_width: width / n,
        promo_weeks,
    }
}
