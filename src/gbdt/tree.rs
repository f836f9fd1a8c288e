//! Single regression tree with leaf-wise growth
//!
//! Trees are grown best-first: the leaf whose best split yields the highest
//! gain is expanded until the leaf cap is reached or no split clears the
//! gain threshold. Numeric features split on a threshold, categorical
//! features on a set of codes ordered by gradient statistics. Missing values
//! follow a per-split default direction chosen by gain.

use crate::dataset::FeatureMatrix;
use crate::gbdt::GbdtParams;
use std::collections::HashMap;

/// Split predicate of an internal node.
#[derive(Debug, Clone)]
pub enum SplitKind {
    Numeric { threshold: f64, missing_left: bool },
    Categorical { left_cats: Vec<u32>, missing_left: bool },
}

impl SplitKind {
    fn goes_left(&self, value: f64) -> bool {
        match self {
            SplitKind::Numeric {
                threshold,
                missing_left,
            } => {
                if value.is_nan() {
                    *missing_left
                } else {
                    value <= *threshold
                }
            }
            SplitKind::Categorical {
                left_cats,
                missing_left,
            } => {
                if value.is_nan() {
                    *missing_left
                } else {
                    left_cats.binary_search(&(value as u32)).is_ok()
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Internal {
        feature: usize,
        split: SplitKind,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted regression tree; leaf values already include shrinkage.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Route one matrix row to its leaf value.
    pub fn predict_row(&self, matrix: &FeatureMatrix, row: usize) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    let value = matrix.value(*feature, row);
                    idx = if split.goes_left(value) { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// A single-leaf tree whose value is effectively zero contributes
    /// nothing; boosting has converged for this objective.
    pub fn is_null_stump(&self) -> bool {
        matches!(self.nodes.as_slice(), [Node::Leaf { value }] if value.abs() < 1e-12)
    }
}

struct SplitCandidate {
    feature: usize,
    kind: SplitKind,
    gain: f64,
}

struct LeafState {
    node: usize,
    rows: Vec<usize>,
    sum_grad: f64,
    sum_hess: f64,
    best: Option<SplitCandidate>,
}

/// Grow one tree against the given gradients, accumulating per-feature split
/// gains into `importance`.
pub fn grow(
    matrix: &FeatureMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    params: &GbdtParams,
    importance: &mut [f64],
) -> Tree {
    let sum_grad: f64 = rows.iter().map(|&i| grad[i]).sum();
    let sum_hess: f64 = rows.iter().map(|&i| hess[i]).sum();

    let mut nodes = vec![Node::Leaf {
        value: leaf_value(sum_grad, sum_hess, params),
    }];
    let mut leaves = vec![LeafState {
        node: 0,
        rows: rows.to_vec(),
        sum_grad,
        sum_hess,
        best: find_best_split(matrix, grad, hess, rows, params),
    }];

    while leaves.len() < params.num_leaves {
        // Expand the leaf with the globally best split.
        let mut chosen: Option<(usize, f64)> = None;
        for (i, leaf) in leaves.iter().enumerate() {
            if let Some(best) = &leaf.best {
                if chosen.map_or(true, |(_, gain)| best.gain > gain) {
                    chosen = Some((i, best.gain));
                }
            }
        }
        let Some((leaf_idx, _)) = chosen else { break };

        let leaf = leaves.swap_remove(leaf_idx);
        let Some(candidate) = leaf.best else { break };

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for &row in &leaf.rows {
            let value = matrix.value(candidate.feature, row);
            if candidate.kind.goes_left(value) {
                left_rows.push(row);
            } else {
                right_rows.push(row);
            }
        }

        let left_grad: f64 = left_rows.iter().map(|&i| grad[i]).sum();
        let left_hess: f64 = left_rows.iter().map(|&i| hess[i]).sum();
        let right_grad = leaf.sum_grad - left_grad;
        let right_hess = leaf.sum_hess - left_hess;

        let left_node = nodes.len();
        nodes.push(Node::Leaf {
            value: leaf_value(left_grad, left_hess, params),
        });
        let right_node = nodes.len();
        nodes.push(Node::Leaf {
            value: leaf_value(right_grad, right_hess, params),
        });
        nodes[leaf.node] = Node::Internal {
            feature: candidate.feature,
            split: candidate.kind,
            left: left_node,
            right: right_node,
        };
        importance[candidate.feature] += candidate.gain;

        let left_best = find_best_split(matrix, grad, hess, &left_rows, params);
        let right_best = find_best_split(matrix, grad, hess, &right_rows, params);
        leaves.push(LeafState {
            node: left_node,
            rows: left_rows,
            sum_grad: left_grad,
            sum_hess: left_hess,
            best: left_best,
        });
        leaves.push(LeafState {
            node: right_node,
            rows: right_rows,
            sum_grad: right_grad,
            sum_hess: right_hess,
            best: right_best,
        });
    }

    Tree { nodes }
}

fn leaf_value(sum_grad: f64, sum_hess: f64, params: &GbdtParams) -> f64 {
    if sum_hess + params.lambda_l2 <= 0.0 {
        return 0.0;
    }
    -sum_grad / (sum_hess + params.lambda_l2) * params.learning_rate
}

fn split_score(sum_grad: f64, sum_hess: f64, lambda: f64) -> f64 {
    if sum_hess + lambda <= 0.0 {
        return 0.0;
    }
    sum_grad * sum_grad / (sum_hess + lambda)
}

fn find_best_split(
    matrix: &FeatureMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    params: &GbdtParams,
) -> Option<SplitCandidate> {
    let min_data = params.min_data_in_leaf.max(1);
    if rows.len() < 2 * min_data {
        return None;
    }

    let total_grad: f64 = rows.iter().map(|&i| grad[i]).sum();
    let total_hess: f64 = rows.iter().map(|&i| hess[i]).sum();
    let parent_score = split_score(total_grad, total_hess, params.lambda_l2);

    let mut best: Option<SplitCandidate> = None;
    for feature in 0..matrix.n_features() {
        let candidate = if matrix.categorical[feature] {
            best_categorical_split(
                matrix, grad, hess, rows, feature, total_grad, total_hess, parent_score, params,
            )
        } else {
            best_numeric_split(
                matrix, grad, hess, rows, feature, total_grad, total_hess, parent_score, params,
            )
        };
        if let Some(candidate) = candidate {
            if best.as_ref().map_or(true, |b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        }
    }

    best.filter(|b| b.gain > params.min_split_gain && b.gain.is_finite())
}

#[allow(clippy::too_many_arguments)]
fn best_numeric_split(
    matrix: &FeatureMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    feature: usize,
    total_grad: f64,
    total_hess: f64,
    parent_score: f64,
    params: &GbdtParams,
) -> Option<SplitCandidate> {
    let min_data = params.min_data_in_leaf.max(1);

    let mut present: Vec<(f64, f64, f64)> = Vec::with_capacity(rows.len());
    let mut missing_grad = 0.0;
    let mut missing_hess = 0.0;
    let mut missing_count = 0usize;
    for &row in rows {
        let value = matrix.value(feature, row);
        if value.is_nan() {
            missing_grad += grad[row];
            missing_hess += hess[row];
            missing_count += 1;
        } else {
            present.push((value, grad[row], hess[row]));
        }
    }
    if present.len() < 2 {
        return None;
    }
    present.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total_count = rows.len();
    let mut best: Option<SplitCandidate> = None;
    let mut left_grad = 0.0;
    let mut left_hess = 0.0;
    let mut left_count = 0usize;

    for i in 0..present.len() - 1 {
        let (value, g, h) = present[i];
        left_grad += g;
        left_hess += h;
        left_count += 1;
        if value == present[i + 1].0 {
            continue;
        }

        for &missing_left in missing_sides(missing_count) {
            let (gl, hl, cl) = if missing_left {
                (
                    left_grad + missing_grad,
                    left_hess + missing_hess,
                    left_count + missing_count,
                )
            } else {
                (left_grad, left_hess, left_count)
            };
            let cr = total_count - cl;
            if cl < min_data || cr < min_data {
                continue;
            }
            let gr = total_grad - gl;
            let hr = total_hess - hl;
            let gain = 0.5
                * (split_score(gl, hl, params.lambda_l2) + split_score(gr, hr, params.lambda_l2)
                    - parent_score);
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    kind: SplitKind::Numeric {
                        threshold: value,
                        missing_left,
                    },
                    gain,
                });
            }
        }
    }
    best
}

#[allow(clippy::too_many_arguments)]
fn best_categorical_split(
    matrix: &FeatureMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    feature: usize,
    total_grad: f64,
    total_hess: f64,
    parent_score: f64,
    params: &GbdtParams,
) -> Option<SplitCandidate> {
    let min_data = params.min_data_in_leaf.max(1);

    let mut stats: HashMap<u32, (f64, f64, usize)> = HashMap::new();
    let mut missing_grad = 0.0;
    let mut missing_hess = 0.0;
    let mut missing_count = 0usize;
    for &row in rows {
        let value = matrix.value(feature, row);
        if value.is_nan() {
            missing_grad += grad[row];
            missing_hess += hess[row];
            missing_count += 1;
        } else {
            let entry = stats.entry(value as u32).or_insert((0.0, 0.0, 0));
            entry.0 += grad[row];
            entry.1 += hess[row];
            entry.2 += 1;
        }
    }
    if stats.len() < 2 {
        return None;
    }

    // Order categories by gradient ratio so a contiguous prefix behaves like
    // an ordered split; ties break on the code for determinism.
    let mut ordered: Vec<(u32, f64, f64, usize)> = stats
        .into_iter()
        .map(|(code, (g, h, c))| (code, g, h, c))
        .collect();
    ordered.sort_by(|a, b| {
        let ra = a.1 / a.2.max(1.0) as f64;
        let rb = b.1 / b.2.max(1.0) as f64;
        ra.total_cmp(&rb).then(a.0.cmp(&b.0))
    });

    let total_count = rows.len();
    let mut best: Option<SplitCandidate> = None;
    let mut left_grad = 0.0;
    let mut left_hess = 0.0;
    let mut left_count = 0usize;
    let mut left_cats: Vec<u32> = Vec::new();

    for i in 0..ordered.len() - 1 {
        let (code, g, h, c) = ordered[i];
        left_grad += g;
        left_hess += h;
        left_count += c;
        left_cats.push(code);

        for &missing_left in missing_sides(missing_count) {
            let (gl, hl, cl) = if missing_left {
                (
                    left_grad + missing_grad,
                    left_hess + missing_hess,
                    left_count + missing_count,
                )
            } else {
                (left_grad, left_hess, left_count)
            };
            let cr = total_count - cl;
            if cl < min_data || cr < min_data {
                continue;
            }
            let gr = total_grad - gl;
            let hr = total_hess - hl;
            let gain = 0.5
                * (split_score(gl, hl, params.lambda_l2) + split_score(gr, hr, params.lambda_l2)
                    - parent_score);
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut cats = left_cats.clone();
                cats.sort_unstable();
                best = Some(SplitCandidate {
                    feature,
                    kind: SplitKind::Categorical {
                        left_cats: cats,
                        missing_left,
                    },
                    gain,
                });
            }
        }
    }
    best
}

/// Which default directions to try for missing values.
fn missing_sides(missing_count: usize) -> &'static [bool] {
    if missing_count > 0 {
        &[true, false]
    } else {
        &[false]
    }
}
