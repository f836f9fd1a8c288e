//! Future frame construction
//!
//! Builds the cross-product grid of future weeks x markets x SKUs and
//! attaches planned price, weather, holiday and promo attributes to each
//! cell through left joins. The price plan is the authoritative active set:
//! a SKU absent from it is excluded from forecasting even if it has history.

use crate::data::{CalendarRow, PricePlanRow, PromoWindowRow, WeatherRow};
use crate::error::{ForecastError, Result};
use crate::frame::{from_day_number, to_day_number};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// One unlabeled grid cell with its joined driver attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureRow {
    pub market: String,
    pub sku_id: String,
    pub week_start: NaiveDate,
    pub price: Option<f64>,
    pub temp_c: Option<f64>,
    pub rain_mm: Option<f64>,
    pub holiday_flag: Option<i64>,
    pub promo_flag: i64,
}

/// Interval index over promo windows, keyed by (market, sku_id).
///
/// Windows are inclusive on both ends. Overlapping windows for the same key
/// are merged at build time (union semantics, no double counting), so a
/// membership check is one binary search instead of a scan over every window.
#[derive(Debug, Clone, Default)]
pub struct PromoIndex {
    windows: HashMap<(String, String), Vec<(NaiveDate, NaiveDate)>>,
}

impl PromoIndex {
    /// Build the index from raw window rows. Windows with `start > end` can
    /// never match and are dropped.
    pub fn build(rows: &[PromoWindowRow]) -> Self {
        let mut grouped: HashMap<(String, String), Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
        for row in rows {
            if row.week_start > row.week_end {
                continue;
            }
            grouped
                .entry((row.market.clone(), row.sku_id.clone()))
                .or_default()
                .push((row.week_start, row.week_end));
        }

        for intervals in grouped.values_mut() {
            intervals.sort_unstable();
            let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(intervals.len());
            for &(start, end) in intervals.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1 => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            *intervals = merged;
        }

        Self { windows: grouped }
    }

    /// Is the given week inside some promo window for this (market, sku)?
    pub fn is_on_promo(&self, market: &str, sku_id: &str, week: NaiveDate) -> bool {
        let Some(intervals) = self
            .windows
            .get(&(market.to_string(), sku_id.to_string()))
        else {
            return false;
        };
        // Intervals are disjoint and sorted; only the last window starting at
        // or before the week can cover it.
        let idx = intervals.partition_point(|&(start, _)| start <= week);
        if idx == 0 {
            return false;
        }
        week <= intervals[idx - 1].1
    }
}

/// Build the future frame: full grid, left-joined attributes, promo flags.
///
/// Left joins keep every grid row; unmatched lookups leave the attribute
/// missing rather than dropping the row.
pub fn build_future_frame(
    calendar: &[CalendarRow],
    price_plan: &[PricePlanRow],
    weather: &[WeatherRow],
    promos: &[PromoWindowRow],
) -> Result<Vec<FutureRow>> {
    let weeks = distinct(calendar.iter().map(|r| r.week_start));
    let markets = distinct(price_plan.iter().map(|r| r.market.clone()));
    let skus = distinct(price_plan.iter().map(|r| r.sku_id.clone()));

    let n = weeks.len() * markets.len() * skus.len();
    let mut grid_market = Vec::with_capacity(n);
    let mut grid_sku = Vec::with_capacity(n);
    let mut grid_week = Vec::with_capacity(n);
    for &week in &weeks {
        for market in &markets {
            for sku in &skus {
                grid_market.push(market.clone());
                grid_sku.push(sku.clone());
                grid_week.push(to_day_number(week));
            }
        }
    }
    let grid = DataFrame::new(vec![
        Series::new("market", grid_market),
        Series::new("sku_id", grid_sku),
        Series::new("week_start", grid_week),
    ])?;

    let price_df = DataFrame::new(vec![
        Series::new(
            "market",
            price_plan.iter().map(|r| r.market.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "sku_id",
            price_plan.iter().map(|r| r.sku_id.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "week_start",
            price_plan
                .iter()
                .map(|r| to_day_number(r.week_start))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "price",
            price_plan.iter().map(|r| r.planned_price).collect::<Vec<_>>(),
        ),
    ])?;

    let weather_df = DataFrame::new(vec![
        Series::new(
            "market",
            weather.iter().map(|r| r.market.clone()).collect::<Vec<_>>(),
        ),
        Series::new(
            "week_start",
            weather
                .iter()
                .map(|r| to_day_number(r.week_start))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "temp_c",
            weather.iter().map(|r| r.temp_c).collect::<Vec<_>>(),
        ),
        Series::new(
            "rain_mm",
            weather.iter().map(|r| r.rain_mm).collect::<Vec<_>>(),
        ),
    ])?;

    let holiday_df = DataFrame::new(vec![
        Series::new(
            "week_start",
            calendar
                .iter()
                .map(|r| to_day_number(r.week_start))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "holiday_flag",
            calendar.iter().map(|r| r.holiday_flag).collect::<Vec<_>>(),
        ),
    ])?;

    let joined = grid
        .left_join(
            &price_df,
            ["market", "sku_id", "week_start"],
            ["market", "sku_id", "week_start"],
        )?
        .left_join(&weather_df, ["market", "week_start"], ["market", "week_start"])?
        .left_join(&holiday_df, ["week_start"], ["week_start"])?;

    let promo_index = PromoIndex::build(promos);

    let market_col = joined.column("market")?.utf8()?;
    let sku_col = joined.column("sku_id")?.utf8()?;
    let week_col = joined.column("week_start")?.i64()?;
    let price_col = joined.column("price")?.f64()?;
    let temp_col = joined.column("temp_c")?.f64()?;
    let rain_col = joined.column("rain_mm")?.f64()?;
    let holiday_col = joined.column("holiday_flag")?.i64()?;

    let mut rows = Vec::with_capacity(joined.height());
    for i in 0..joined.height() {
        let market = market_col.get(i).unwrap_or_default().to_string();
        let sku_id = sku_col.get(i).unwrap_or_default().to_string();
        let week_start = week_col
            .get(i)
            .and_then(from_day_number)
            .ok_or_else(|| {
                ForecastError::DataIntegrity(format!("Missing week_start at grid row {}", i))
            })?;
        let promo_flag = i64::from(promo_index.is_on_promo(&market, &sku_id, week_start));

        rows.push(FutureRow {
            market,
            sku_id,
            week_start,
            price: price_col.get(i),
            temp_c: temp_col.get(i),
            rain_mm: rain_col.get(i),
            holiday_flag: holiday_col.get(i),
            promo_flag,
        });
    }
    Ok(rows)
}

/// Distinct values in first-seen order.
fn distinct<T: Clone + std::hash::Hash + Eq>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}
