//! Unified feature assembly
//!
//! Concatenates labeled historical rows and unlabeled future-frame rows into
//! one frame, sorts by week start, runs the temporal encoder once over the
//! combined set, and partitions back into train and inference frames by the
//! per-row kind tag.

use crate::data::PanelRow;
use crate::error::Result;
use crate::frame::{to_day_number, FeatureFrame};
use crate::future::FutureRow;
use crate::temporal;
use polars::prelude::*;

/// The train/inference pair produced by one assembly pass.
#[derive(Debug, Clone)]
pub struct AssembledFrame {
    /// Historical rows carrying a demand label.
    pub train: FeatureFrame,
    /// Future rows awaiting prediction.
    pub future: FeatureFrame,
}

/// Assemble the unified frame and split it for training and inference.
///
/// A panel row without a `units` value carries no label and is tagged as a
/// future row, matching the original partition-by-label behavior.
pub fn assemble(panel: &[PanelRow], future: &[FutureRow]) -> Result<AssembledFrame> {
    let n = panel.len() + future.len();
    let mut markets = Vec::with_capacity(n);
    let mut skus = Vec::with_capacity(n);
    let mut weeks: Vec<Option<i64>> = Vec::with_capacity(n);
    let mut units: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut is_future = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);
    let mut temp_c = Vec::with_capacity(n);
    let mut rain_mm = Vec::with_capacity(n);
    let mut promo_flag = Vec::with_capacity(n);
    let mut holiday_flag = Vec::with_capacity(n);

    for row in panel {
        markets.push(row.market.clone());
        skus.push(row.sku_id.clone());
        weeks.push(row.week_start.map(to_day_number));
        units.push(row.units);
        is_future.push(row.units.is_none());
        price.push(row.price);
        temp_c.push(row.temp_c);
        rain_mm.push(row.rain_mm);
        promo_flag.push(row.promo_flag);
        holiday_flag.push(row.holiday_flag);
    }

    for row in future {
        markets.push(row.market.clone());
        skus.push(row.sku_id.clone());
        weeks.push(Some(to_day_number(row.week_start)));
        units.push(None);
        is_future.push(true);
        price.push(row.price);
        temp_c.push(row.temp_c);
        rain_mm.push(row.rain_mm);
        promo_flag.push(Some(row.promo_flag));
        holiday_flag.push(row.holiday_flag);
    }

    let df = DataFrame::new(vec![
        Series::new("market", markets),
        Series::new("sku_id", skus),
        Series::new("week_start", weeks),
        Series::new("units", units),
        Series::new("is_future", is_future),
        Series::new("price", price),
        Series::new("temp_c", temp_c),
        Series::new("rain_mm", rain_mm),
        Series::new("promo_flag", promo_flag),
        Series::new("holiday_flag", holiday_flag),
    ])?;

    let mut frame = FeatureFrame::from_dataframe(df);
    frame.sort_by_week()?;
    temporal::encode(&mut frame)?;

    let (train, future) = frame.partition()?;
    Ok(AssembledFrame { train, future })
}
