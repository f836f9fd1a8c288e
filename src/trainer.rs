//! Three-model ensemble training
//!
//! Fits the mean, lower-quantile and upper-quantile ensembles on the same
//! training partition with the same categorical declarations. The three fits
//! are independent of each other (no shared mutable state, no ordering
//! constraint between their outputs); they run sequentially here but could
//! be parallelized freely.

use crate::dataset::{build_matrix, training_labels, CategoryVocab, FeatureSet};
use crate::error::Result;
use crate::frame::FeatureFrame;
use crate::gbdt::{Booster, GbdtParams, Objective};

/// Quantile level of the lower interval bound.
pub const LOWER_QUANTILE: f64 = 0.05;
/// Quantile level of the upper interval bound.
pub const UPPER_QUANTILE: f64 = 0.95;

/// The immutable model triple for one session, together with the feature
/// declarations and categorical dictionary needed to reproduce the matrix at
/// prediction time.
#[derive(Debug, Clone)]
pub struct TrainedEnsembles {
    pub mean: Booster,
    pub lower: Booster,
    pub upper: Booster,
    pub feature_set: FeatureSet,
    pub vocab: CategoryVocab,
}

/// Trainer for the mean + quantile ensemble triple.
#[derive(Debug, Clone)]
pub struct EnsembleTrainer {
    feature_set: FeatureSet,
    params: GbdtParams,
}

impl EnsembleTrainer {
    pub fn new(feature_set: FeatureSet, params: GbdtParams) -> Self {
        Self {
            feature_set,
            params,
        }
    }

    /// Trainer with the demand model's standard features and hyperparameters.
    pub fn demand_default() -> Self {
        Self::new(FeatureSet::demand_default(), GbdtParams::demand_default())
    }

    /// Train all three ensembles on the historical partition.
    ///
    /// Type validation runs before any fit; a declared-numeric feature column
    /// holding text fails the whole triple with
    /// [`crate::error::ForecastError::DataType`] and no model is produced.
    pub fn train(&self, train_frame: &FeatureFrame) -> Result<TrainedEnsembles> {
        let vocab = CategoryVocab::build(train_frame, &self.feature_set)?;
        let matrix = build_matrix(train_frame, &self.feature_set, &vocab)?;
        let labels = training_labels(train_frame)?;

        log::info!(
            "Training mean + quantile ensembles on {} rows, {} features",
            matrix.n_rows,
            matrix.n_features()
        );

        let mean = Booster::train(&matrix, &labels, Objective::SquaredError, &self.params)?;
        let lower = Booster::train(
            &matrix,
            &labels,
            Objective::Quantile {
                alpha: LOWER_QUANTILE,
            },
            &self.params,
        )?;
        let upper = Booster::train(
            &matrix,
            &labels,
            Objective::Quantile {
                alpha: UPPER_QUANTILE,
            },
            &self.params,
        )?;

        Ok(TrainedEnsembles {
            mean,
            lower,
            upper,
            feature_set: self.feature_set.clone(),
            vocab,
        })
    }
}
