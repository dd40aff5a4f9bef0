//! Random forest regression
//!
//! Bootstrap ensemble of variance-reduction regression trees. Splits
//! minimize the summed squared error of the two children; leaves predict
//! the mean target of the samples that reached them. Deterministic when
//! driven by a seeded RNG.

use rand::rngs::StdRng;
use rand::Rng;

/// A node in a regression tree
#[derive(Debug, Clone)]
enum TreeNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
    },
}

impl TreeNode {
    fn predict(&self, sample: &[f64]) -> f64 {
        match self {
            TreeNode::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
            TreeNode::Leaf { value } => *value,
        }
    }
}

/// Single regression tree grown to `max_depth`.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: TreeNode,
}

/// Best split of one feature: (threshold, summed squared error after split).
fn best_split_for_feature(
    samples: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature: usize,
) -> Option<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = indices
        .iter()
        .map(|&i| (samples[i][feature], targets[i]))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let n = pairs.len();
    let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
    let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

    let mut best: Option<(f64, f64)> = None;
    let mut left_sum = 0.0;
    let mut left_sq = 0.0;
    for i in 1..n {
        left_sum += pairs[i - 1].1;
        left_sq += pairs[i - 1].1 * pairs[i - 1].1;
        // Only split between distinct feature values
        if pairs[i].0 <= pairs[i - 1].0 {
            continue;
        }
        let left_n = i as f64;
        let right_n = (n - i) as f64;
        let right_sum = total_sum - left_sum;
        let right_sq = total_sq - left_sq;
        let sse = (left_sq - left_sum * left_sum / left_n)
            + (right_sq - right_sum * right_sum / right_n);
        let threshold = (pairs[i - 1].0 + pairs[i].0) / 2.0;
        if best.is_none_or(|(_, best_sse)| sse < best_sse) {
            best = Some((threshold, sse));
        }
    }
    best
}

impl RegressionTree {
    fn fit(samples: &[Vec<f64>], targets: &[f64], indices: &[usize], max_depth: usize) -> Self {
        RegressionTree {
            root: Self::build_node(samples, targets, indices, 0, max_depth),
        }
    }

    fn build_node(
        samples: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        max_depth: usize,
    ) -> TreeNode {
        let leaf_value = || {
            let sum: f64 = indices.iter().map(|&i| targets[i]).sum();
            TreeNode::Leaf {
                value: if indices.is_empty() {
                    0.0
                } else {
                    sum / indices.len() as f64
                },
            }
        };

        if indices.len() < 2 || depth >= max_depth {
            return leaf_value();
        }

        let num_features = samples[indices[0]].len();
        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..num_features {
            if let Some((threshold, sse)) =
                best_split_for_feature(samples, targets, indices, feature)
            {
                if best.is_none_or(|(_, _, best_sse)| sse < best_sse) {
                    best = Some((feature, threshold, sse));
                }
            }
        }

        // No feature separates the samples
        let Some((feature, threshold, _)) = best else {
            return leaf_value();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i][feature] < threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return leaf_value();
        }

        TreeNode::Internal {
            feature,
            threshold,
            left: Box::new(Self::build_node(
                samples,
                targets,
                &left_indices,
                depth + 1,
                max_depth,
            )),
            right: Box::new(Self::build_node(
                samples,
                targets,
                &right_indices,
                depth + 1,
                max_depth,
            )),
        }
    }

    pub fn predict(&self, sample: &[f64]) -> f64 {
        self.root.predict(sample)
    }
}

/// Random forest regressor: bagged regression trees, mean-aggregated.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    num_trees: usize,
    max_depth: usize,
}

impl RandomForestRegressor {
    pub fn new(num_trees: usize, max_depth: usize) -> Self {
        RandomForestRegressor {
            trees: Vec::new(),
            num_trees,
            max_depth,
        }
    }

    /// Fit on training data, bootstrapping one sample set per tree.
    pub fn fit(&mut self, samples: &[Vec<f64>], targets: &[f64], rng: &mut StdRng) {
        let n = samples.len();
        if n == 0 {
            return;
        }
        self.trees.clear();
        for _ in 0..self.num_trees {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            self.trees
                .push(RegressionTree::fit(samples, targets, &indices, self.max_depth));
        }
    }

    /// Mean prediction over all trees; 0 before fitting.
    pub fn predict(&self, sample: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(sample)).sum();
        sum / self.trees.len() as f64
    }
}
