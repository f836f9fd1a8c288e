//! Input table schemas and CSV loading
//!
//! The five input tables (historical panel, future price plan, promo windows,
//! weather forecast, holiday calendar) arrive as delimited text with
//! day-month-year dates. Loading is fail-fast: any table that is missing or
//! unreadable aborts the pipeline before feature assembly with
//! [`ForecastError::DataLoad`].

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Date format used by all input tables on ingestion.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

pub(crate) mod dmy_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod dmy_date_opt {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    /// An empty field is a missing timestamp, not a parse error; the temporal
    /// encoder is the component that rejects it.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// One historical observation: a (market, sku, week) cell with observed demand
/// and the driver values that held that week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelRow {
    pub market: String,
    pub sku_id: String,
    #[serde(deserialize_with = "dmy_date_opt::deserialize")]
    pub week_start: Option<NaiveDate>,
    pub units: Option<f64>,
    pub price: Option<f64>,
    pub promo_flag: Option<i64>,
    pub holiday_flag: Option<i64>,
    pub temp_c: Option<f64>,
    pub rain_mm: Option<f64>,
}

/// Planned price for a future (market, sku, week) cell. The markets and SKUs
/// present here define the active forecasting scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePlanRow {
    pub market: String,
    pub sku_id: String,
    #[serde(deserialize_with = "dmy_date::deserialize")]
    pub week_start: NaiveDate,
    pub planned_price: Option<f64>,
}

/// A planned promotion window, inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoWindowRow {
    pub market: String,
    pub sku_id: String,
    #[serde(deserialize_with = "dmy_date::deserialize")]
    pub week_start: NaiveDate,
    #[serde(deserialize_with = "dmy_date::deserialize")]
    pub week_end: NaiveDate,
}

/// Weather forecast for a (market, week) cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRow {
    pub market: String,
    #[serde(deserialize_with = "dmy_date::deserialize")]
    pub week_start: NaiveDate,
    pub temp_c: Option<f64>,
    pub rain_mm: Option<f64>,
}

/// Market-agnostic holiday calendar for a future week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRow {
    #[serde(deserialize_with = "dmy_date::deserialize")]
    pub week_start: NaiveDate,
    pub holiday_flag: Option<i64>,
}

/// The five input tables for one forecasting session.
#[derive(Debug, Clone, Serialize)]
pub struct InputTables {
    pub panel: Vec<PanelRow>,
    pub price_plan: Vec<PricePlanRow>,
    pub promos: Vec<PromoWindowRow>,
    pub weather: Vec<WeatherRow>,
    pub calendar: Vec<CalendarRow>,
}

impl InputTables {
    /// Load all five tables from a directory of CSV files with the standard
    /// file names. Any missing or unreadable table aborts the whole load.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            panel: read_table(dir.join("panel_train.csv"))?,
            price_plan: read_table(dir.join("price_plan_future.csv"))?,
            promos: read_table(dir.join("promos_future.csv"))?,
            weather: read_table(dir.join("weather_future.csv"))?,
            calendar: read_table(dir.join("calendar_future.csv"))?,
        })
    }

    /// Stable identity of the loaded inputs, used as the pipeline cache key.
    /// Two sessions with byte-equivalent tables share a fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        hasher.finish()
    }
}

fn read_table<T: DeserializeOwned>(path: std::path::PathBuf) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(&path)
        .map_err(|e| ForecastError::DataLoad(format!("{}: {}", path.display(), e)))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row =
            record.map_err(|e| ForecastError::DataLoad(format!("{}: {}", path.display(), e)))?;
        rows.push(row);
    }
    Ok(rows)
}
