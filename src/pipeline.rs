//! End-to-end pipeline orchestration
//!
//! One synchronous run per dashboard interaction: build the future frame,
//! assemble features, train the three ensembles, predict, derive driver
//! attribution. Each stage's failure propagates immediately; no partial
//! output is produced when the chain breaks.
//!
//! Results are pure functions of the input tables, so the pipeline owns an
//! explicit single-slot cache keyed by the input fingerprint. A changed
//! fingerprint invalidates; identical inputs return the cached report
//! without re-training.

use crate::assemble;
use crate::data::InputTables;
use crate::dataset::FeatureSet;
use crate::diagnostics;
use crate::error::Result;
use crate::future::build_future_frame;
use crate::gbdt::GbdtParams;
use crate::predict::{self, ForecastSet};
use crate::trainer::EnsembleTrainer;

/// Everything one session exposes to the reporting layer.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    /// The forecast table keyed by (market, sku_id, week_start).
    pub forecasts: ForecastSet,
    /// Top drivers by gain importance of the mean model.
    pub drivers: Vec<(String, f64)>,
}

struct CacheEntry {
    key: u64,
    report: ForecastReport,
}

/// Session-scoped pipeline with an explicit result cache.
pub struct ForecastPipeline {
    feature_set: FeatureSet,
    params: GbdtParams,
    cache: Option<CacheEntry>,
    cache_hits: usize,
}

impl Default for ForecastPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastPipeline {
    /// Pipeline with the demand model's standard configuration.
    pub fn new() -> Self {
        Self::with_config(FeatureSet::demand_default(), GbdtParams::demand_default())
    }

    pub fn with_config(feature_set: FeatureSet, params: GbdtParams) -> Self {
        Self {
            feature_set,
            params,
            cache: None,
            cache_hits: 0,
        }
    }

    /// How many runs were served from the cache instead of recomputed.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Run the pipeline end-to-end, reusing the cached report when the input
    /// fingerprint is unchanged.
    pub fn run(&mut self, tables: &InputTables) -> Result<ForecastReport> {
        let key = tables.fingerprint();
        if let Some(entry) = &self.cache {
            if entry.key == key {
                log::info!("Input fingerprint unchanged; serving cached forecast");
                let report = entry.report.clone();
                self.cache_hits += 1;
                return Ok(report);
            }
        }

        let report = self.compute(tables)?;
        self.cache = Some(CacheEntry {
            key,
            report: report.clone(),
        });
        Ok(report)
    }

    fn compute(&self, tables: &InputTables) -> Result<ForecastReport> {
        log::info!(
            "Preparing future frame for {} calendar weeks, {} price-plan rows",
            tables.calendar.len(),
            tables.price_plan.len()
        );
        let future_rows = build_future_frame(
            &tables.calendar,
            &tables.price_plan,
            &tables.weather,
            &tables.promos,
        )?;

        let assembled = assemble::assemble(&tables.panel, &future_rows)?;
        log::info!(
            "Assembled {} training rows, {} inference rows",
            assembled.train.len(),
            assembled.future.len()
        );

        let trainer = EnsembleTrainer::new(self.feature_set.clone(), self.params.clone());
        let models = trainer.train(&assembled.train)?;

        let forecasts = predict::predict(&models, &assembled.future)?;
        let drivers = diagnostics::driver_attribution(&models.mean);

        Ok(ForecastReport { forecasts, drivers })
    }
}
