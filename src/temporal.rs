//! Temporal feature encoding
//!
//! Turns weekly timestamps into numeric trend and seasonality coordinates:
//! a dense `time_index` over the distinct sorted weeks of the whole frame,
//! a cyclical sine/cosine pair over the ISO week of year, and plain month
//! and quarter codes. Runs once over the combined history+future frame so
//! the coordinates stay consistent across the boundary.

use crate::error::{ForecastError, Result};
use crate::frame::FeatureFrame;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Cycle length for the week-of-year encoding.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Names of the columns this encoder adds, in order.
pub const TEMPORAL_COLUMNS: [&str; 6] = [
    "time_index",
    "week_of_year",
    "sin_week",
    "cos_week",
    "month",
    "quarter",
];

/// Encode temporal features in place.
///
/// Refuses to proceed if any row lacks a timestamp: encoding a frame with
/// missing weeks would silently produce garbage trend coordinates, so it is
/// a [`ForecastError::DataIntegrity`] instead.
pub fn encode(frame: &mut FeatureFrame) -> Result<()> {
    let mut weeks = Vec::with_capacity(frame.len());
    for (row, week) in frame.weeks()?.iter().enumerate() {
        match week {
            Some(week) => weeks.push(*week),
            None => {
                return Err(ForecastError::DataIntegrity(format!(
                    "Missing week_start at row {}",
                    row
                )))
            }
        }
    }

    // time_index is the zero-based rank among distinct sorted weeks across
    // the whole frame, so future weeks need not be contiguous with history.
    let mut distinct = weeks.clone();
    distinct.sort_unstable();
    distinct.dedup();
    let rank: HashMap<NaiveDate, usize> = distinct
        .iter()
        .enumerate()
        .map(|(i, week)| (*week, i))
        .collect();

    let n = weeks.len();
    let mut time_index = Vec::with_capacity(n);
    let mut week_of_year = Vec::with_capacity(n);
    let mut sin_week = Vec::with_capacity(n);
    let mut cos_week = Vec::with_capacity(n);
    let mut month = Vec::with_capacity(n);
    let mut quarter = Vec::with_capacity(n);

    for week in &weeks {
        time_index.push(rank[week] as f64);

        // ISO week 1..=53. A missing week-of-year would default to 0 before
        // the cyclical encoding; with validated dates it is always present.
        let woy = week.iso_week().week() as f64;
        week_of_year.push(woy);
        sin_week.push((2.0 * PI * woy / WEEKS_PER_YEAR).sin());
        cos_week.push((2.0 * PI * woy / WEEKS_PER_YEAR).cos());

        let m = week.month();
        month.push(m as f64);
        quarter.push(((m - 1) / 3 + 1) as f64);
    }

    frame.add_column(Series::new("time_index", time_index))?;
    frame.add_column(Series::new("week_of_year", week_of_year))?;
    frame.add_column(Series::new("sin_week", sin_week))?;
    frame.add_column(Series::new("cos_week", cos_week))?;
    frame.add_column(Series::new("month", month))?;
    frame.add_column(Series::new("quarter", quarter))?;
    Ok(())
}
