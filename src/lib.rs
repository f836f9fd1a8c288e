//! # Demand Forecast
//!
//! A Rust library for probabilistic weekly demand forecasting per market and
//! SKU, driven by historical sales and known future drivers (price plans,
//! promotions, weather, holidays).
//!
//! ## Features
//!
//! - Typed input tables for the historical panel and future driver plans
//! - Feature engineering: cyclical time encoding, cross-product future grid,
//!   interval-indexed promo flags, one unified history+future feature space
//! - Three independently trained gradient-boosted tree ensembles producing a
//!   point forecast plus a 90% prediction interval via quantile regression
//! - Driver attribution and uncertainty diagnostics for the reporting layer
//! - Delimited-text forecast export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demand_forecast::data::InputTables;
//! use demand_forecast::pipeline::ForecastPipeline;
//!
//! # fn main() -> demand_forecast::error::Result<()> {
//! // Load the five input tables
//! let tables = InputTables::load_dir("data")?;
//!
//! // Run the pipeline: assemble features, train, predict, diagnose
//! let mut pipeline = ForecastPipeline::new();
//! let report = pipeline.run(&tables)?;
//!
//! for record in report.forecasts.records() {
//!     println!(
//!         "{} {} {}: {:.1} [{:.1}, {:.1}]",
//!         record.market,
//!         record.sku_id,
//!         record.week_start,
//!         record.forecast,
//!         record.lower_90,
//!         record.upper_90
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod data;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod frame;
pub mod future;
pub mod gbdt;
pub mod pipeline;
pub mod predict;
pub mod temporal;
pub mod trainer;

// Re-export commonly used types
pub use crate::data::InputTables;
pub use crate::error::ForecastError;
pub use crate::frame::{FeatureFrame, RowKind};
pub use crate::pipeline::{ForecastPipeline, ForecastReport};
pub use crate::predict::{ForecastRecord, ForecastSet};
pub use crate::trainer::{EnsembleTrainer, TrainedEnsembles};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
