//! Gradient-boosted decision tree ensembles
//!
//! A small native booster with the two objectives the demand model needs:
//! squared error for the point forecast and pinball loss for the interval
//! bounds. Trees are grown leaf-wise against first-order gradients with unit
//! hessians, matching the behavior of the usual histogram boosters on these
//! objectives. Importance is tracked as total split gain per feature.

use crate::dataset::FeatureMatrix;
use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod tree;

use tree::Tree;

/// Training objective; only the loss differs between the three ensembles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// Plain regression, minimizes squared error.
    SquaredError,
    /// Pinball loss at the given quantile level.
    Quantile { alpha: f64 },
}

impl Objective {
    /// Optimal constant prediction to boost from.
    pub fn base_score(&self, labels: &[f64]) -> f64 {
        match self {
            Objective::SquaredError => labels.iter().sum::<f64>() / labels.len() as f64,
            Objective::Quantile { alpha } => quantile(labels, *alpha),
        }
    }

    /// First-order gradient and hessian for one observation.
    pub fn gradient(&self, prediction: f64, label: f64) -> (f64, f64) {
        match self {
            Objective::SquaredError => (prediction - label, 1.0),
            Objective::Quantile { alpha } => {
                if label > prediction {
                    (-alpha, 1.0)
                } else {
                    (1.0 - alpha, 1.0)
                }
            }
        }
    }
}

/// Linearly interpolated empirical quantile.
fn quantile(values: &[f64], alpha: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.is_empty() {
        return 0.0;
    }
    let position = alpha.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Shared ensemble hyperparameters; only the objective differs between the
/// mean and quantile models.
#[derive(Debug, Clone)]
pub struct GbdtParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub num_leaves: usize,
    pub min_data_in_leaf: usize,
    pub lambda_l2: f64,
    pub min_split_gain: f64,
    /// Row fraction sampled per round; 1.0 disables sampling.
    pub subsample: f64,
    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self::demand_default()
    }
}

impl GbdtParams {
    /// The demand model's fixed hyperparameters: 500 boosting rounds,
    /// learning rate 0.1, 31 leaves, fixed seed for reproducibility.
    pub fn demand_default() -> Self {
        Self {
            n_rounds: 500,
            learning_rate: 0.1,
            num_leaves: 31,
            min_data_in_leaf: 20,
            lambda_l2: 0.0,
            min_split_gain: 0.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

/// A fitted ensemble: base score plus shrunken trees. Immutable after
/// training and never persisted across sessions.
#[derive(Debug, Clone)]
pub struct Booster {
    objective: Objective,
    base_score: f64,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    gain_importance: Vec<f64>,
}

impl Booster {
    /// Fit an ensemble on the given matrix and labels.
    pub fn train(
        matrix: &FeatureMatrix,
        labels: &[f64],
        objective: Objective,
        params: &GbdtParams,
    ) -> Result<Booster> {
        if matrix.n_rows == 0 {
            return Err(ForecastError::Validation(
                "Cannot train on an empty frame".to_string(),
            ));
        }
        if labels.len() != matrix.n_rows {
            return Err(ForecastError::Validation(format!(
                "Label length ({}) doesn't match matrix rows ({})",
                labels.len(),
                matrix.n_rows
            )));
        }

        let n = matrix.n_rows;
        let base_score = objective.base_score(labels);
        let mut predictions = vec![base_score; n];
        let mut importance = vec![0.0; matrix.n_features()];
        let mut trees = Vec::new();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        for _ in 0..params.n_rounds {
            for i in 0..n {
                let (g, h) = objective.gradient(predictions[i], labels[i]);
                grad[i] = g;
                hess[i] = h;
            }

            let rows = sample_rows(n, params.subsample, &mut rng);
            let tree = tree::grow(matrix, &grad, &hess, &rows, params, &mut importance);
            if tree.is_null_stump() {
                break;
            }
            for i in 0..n {
                predictions[i] += tree.predict_row(matrix, i);
            }
            trees.push(tree);
        }

        Ok(Booster {
            objective,
            base_score,
            trees,
            feature_names: matrix.names.clone(),
            gain_importance: importance,
        })
    }

    /// Predict every row of a matrix.
    pub fn predict_matrix(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        (0..matrix.n_rows)
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|t| t.predict_row(matrix, row))
                        .sum::<f64>()
            })
            .collect()
    }

    /// Raw gain importance per feature, in training feature order.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        self.feature_names
            .iter()
            .cloned()
            .zip(self.gain_importance.iter().copied())
            .collect()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn sample_rows(n: usize, subsample: f64, rng: &mut StdRng) -> Vec<usize> {
    if subsample >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * subsample).round() as usize).clamp(1, n);
    let mut rows = rand::seq::index::sample(rng, n, k).into_vec();
    rows.sort_unstable();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn squared_error_base_is_mean() {
        let labels = [100.0, 120.0];
        assert_approx_eq!(Objective::SquaredError.base_score(&labels), 110.0);
    }

    #[test]
    fn quantile_base_interpolates() {
        let labels = [100.0, 120.0];
        assert_approx_eq!(Objective::Quantile { alpha: 0.05 }.base_score(&labels), 101.0);
        assert_approx_eq!(Objective::Quantile { alpha: 0.95 }.base_score(&labels), 119.0);
    }

    #[test]
    fn pinball_gradient_is_asymmetric() {
        let objective = Objective::Quantile { alpha: 0.05 };
        let (below, _) = objective.gradient(50.0, 100.0);
        let (above, _) = objective.gradient(150.0, 100.0);
        assert_approx_eq!(below, -0.05);
        assert_approx_eq!(above, 0.95);
    }

    #[test]
    fn subsampling_is_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(sample_rows(100, 0.5, &mut a), sample_rows(100, 0.5, &mut b));
    }
}
