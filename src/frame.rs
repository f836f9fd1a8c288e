//! Feature frame on top of a polars DataFrame
//!
//! The unified modeling frame holds one row per (market, sku_id, week_start)
//! cell. Each row carries an explicit [`RowKind`] tag, stored as an
//! `is_future` column beside the nullable `units` label; the tag, not a
//! sentinel null, drives train/predict routing. Dates are stored as day
//! numbers in an integer column and surface as [`NaiveDate`] at the API
//! boundary.

use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Whether a row is a labeled training observation or a cell to forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowKind {
    /// Observed demand for this cell.
    Historical { units: f64 },
    /// No observation; the predictor fills this cell.
    Future,
}

impl RowKind {
    /// The label carried by a historical row.
    pub fn units(&self) -> Option<f64> {
        match self {
            RowKind::Historical { units } => Some(*units),
            RowKind::Future => None,
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, RowKind::Future)
    }
}

pub(crate) fn to_day_number(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}

pub(crate) fn from_day_number(days: i64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days as i32)
}

/// Column-oriented frame of observation rows backed by a polars DataFrame.
///
/// Row identity (`market`, `sku_id`, `week_start`) and the kind tag
/// (`is_future`, `units`) are ordinary columns; `week_start` stays nullable
/// until the temporal encoder has validated it.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    df: DataFrame,
}

impl FeatureFrame {
    /// Create a frame from its parallel identity vectors.
    pub fn from_parts(
        markets: Vec<String>,
        skus: Vec<String>,
        weeks: Vec<Option<NaiveDate>>,
        kinds: Vec<RowKind>,
    ) -> Result<Self> {
        let weeks: Vec<Option<i64>> = weeks.iter().map(|w| w.map(to_day_number)).collect();
        let units: Vec<Option<f64>> = kinds.iter().map(|k| k.units()).collect();
        let is_future: Vec<bool> = kinds.iter().map(|k| k.is_future()).collect();

        let df = DataFrame::new(vec![
            Series::new("market", markets),
            Series::new("sku_id", skus),
            Series::new("week_start", weeks),
            Series::new("units", units),
            Series::new("is_future", is_future),
        ])?;
        Ok(Self { df })
    }

    pub(crate) fn from_dataframe(df: DataFrame) -> Self {
        Self { df }
    }

    /// The backing DataFrame.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Add or replace a named column. Replacement mirrors dataframe column
    /// assignment so the temporal encoder can be re-run idempotently.
    pub fn add_column(&mut self, series: Series) -> Result<()> {
        self.df.with_column(series)?;
        Ok(())
    }

    pub fn markets(&self) -> Result<Vec<String>> {
        self.utf8_values("market")
    }

    pub fn skus(&self) -> Result<Vec<String>> {
        self.utf8_values("sku_id")
    }

    fn utf8_values(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .df
            .column(name)?
            .utf8()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }

    pub fn weeks(&self) -> Result<Vec<Option<NaiveDate>>> {
        Ok(self
            .df
            .column("week_start")?
            .i64()?
            .into_iter()
            .map(|v| v.and_then(from_day_number))
            .collect())
    }

    /// Per-row kind tags decoded from the `is_future` and `units` columns.
    pub fn kinds(&self) -> Result<Vec<RowKind>> {
        let is_future = self.df.column("is_future")?.bool()?;
        let units = self.df.column("units")?.f64()?;
        Ok(is_future
            .into_iter()
            .zip(units.into_iter())
            .map(|(future, units)| match (future, units) {
                (Some(false), Some(units)) => RowKind::Historical { units },
                _ => RowKind::Future,
            })
            .collect())
    }

    /// A float column as per-row optional values; `None` for missing cells.
    pub fn float_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.df.column(name)?.f64()?.into_iter().collect())
    }

    /// An integer column as per-row optional values; `None` for missing cells.
    pub fn int_values(&self, name: &str) -> Result<Vec<Option<i64>>> {
        Ok(self.df.column(name)?.i64()?.into_iter().collect())
    }

    /// Sort all rows by week_start ascending; rows with a missing timestamp
    /// sink to the end (the encoder rejects them right after).
    pub fn sort_by_week(&mut self) -> Result<()> {
        self.df = self
            .df
            .clone()
            .lazy()
            .sort(
                "week_start",
                SortOptions {
                    descending: false,
                    nulls_last: true,
                    maintain_order: true,
                    ..Default::default()
                },
            )
            .collect()?;
        Ok(())
    }

    /// Split into (historical, future) frames by the per-row kind tag.
    pub fn partition(&self) -> Result<(FeatureFrame, FeatureFrame)> {
        let mask = self.df.column("is_future")?.bool()?;
        let future = self.df.filter(mask)?;
        let historical = self.df.filter(&!mask)?;
        Ok((Self { df: historical }, Self { df: future }))
    }
}
