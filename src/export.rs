//! Forecast table export
//!
//! Writes the reporting layer's delimited-text contract: one row per
//! (sku_id, week_start) within the selected market/SKU scope, sorted by
//! (sku_id, week_start) ascending, numeric columns rounded to two decimals,
//! dates formatted as ISO `YYYY-MM-DD`.

use crate::error::Result;
use crate::predict::{ForecastRecord, ForecastSet};
use std::io::Write;

/// Round to two decimals for display/export.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

const HEADER: [&str; 10] = [
    "week_start",
    "sku_id",
    "forecast",
    "lower_90",
    "upper_90",
    "price",
    "promo_flag",
    "holiday_flag",
    "temp_c",
    "rain_mm",
];

/// Write the forecast export for one market and SKU selection.
///
/// An empty SKU slice selects every SKU of the market. Missing feature
/// values export as empty fields.
pub fn write_forecast_csv<W: Write>(
    writer: W,
    set: &ForecastSet,
    market: &str,
    skus: &[String],
) -> Result<()> {
    let mut rows: Vec<&ForecastRecord> = set
        .records()
        .iter()
        .filter(|r| r.market == market && (skus.is_empty() || skus.contains(&r.sku_id)))
        .collect();
    rows.sort_by(|a, b| (&a.sku_id, a.week_start).cmp(&(&b.sku_id, b.week_start)));

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for row in rows {
        csv_writer.write_record([
            row.week_start.format("%Y-%m-%d").to_string(),
            row.sku_id.clone(),
            format_num(Some(row.forecast)),
            format_num(Some(row.lower_90)),
            format_num(Some(row.upper_90)),
            format_num(row.price),
            row.promo_flag.map(|v| v.to_string()).unwrap_or_default(),
            row.holiday_flag.map(|v| v.to_string()).unwrap_or_default(),
            format_num(row.temp_c),
            format_num(row.rain_mm),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn format_num(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", round2(v)),
        None => String::new(),
    }
}
