//! CART (Classification and Regression Tree) builder
//!
//! Greedy regression tree construction driven by per-sample gradients and
//! hessians. With `g = -y, h = 1` the leaves are plain means (random forest);
//! with `g = pred - y, h = 1` they are boosting residual steps.

use cane_core::model::{Node, Tree};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use std::cmp::Ordering;

/// Minimum gain, relative to the parent score, for a split to be kept
const MIN_RELATIVE_GAIN: f64 = 1e-9;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Upper bound on split candidates evaluated per feature and node
    pub max_bins: usize,
    /// Fraction of features drawn as split candidates at each node
    pub max_features: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_leaf: 1,
            max_bins: 64,
            max_features: 1.0,
        }
    }
}

/// Split candidate with gain
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

impl SplitCandidate {
    /// Higher gain wins; ties go to the lower feature index, then threshold.
    fn beats(&self, other: &SplitCandidate) -> bool {
        match self.gain.total_cmp(&other.gain) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                (self.feature_idx, self.threshold.to_bits()) < (other.feature_idx, other.threshold.to_bits())
            }
        }
    }
}

/// Build a regression tree over a sample of rows
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `features`, `gradients` and `hessians` share row indexing; callers
    /// guarantee equal lengths.
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Self {
        let feature_count = features.first().map_or(0, Vec::len);
        Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        }
    }

    /// Build a tree over `indices` (duplicates allowed, e.g. a bootstrap).
    pub fn build(&self, indices: &[usize], rng: &mut StdRng) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(indices.to_vec(), 0, &mut nodes, rng);
        Tree { nodes }
    }

    fn build_node(
        &self,
        indices: Vec<usize>,
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut StdRng,
    ) -> u32 {
        let current_idx = nodes.len() as u32;
        let leaf_value = self.leaf_value(&indices);

        if depth >= self.config.max_depth || indices.len() < 2 * self.config.min_samples_leaf.max(1) {
            nodes.push(Node::leaf(leaf_value));
            return current_idx;
        }

        let split = match self.find_best_split(&indices, rng) {
            Some(split) => split,
            None => {
                nodes.push(Node::leaf(leaf_value));
                return current_idx;
            }
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

        // Reserve space for current node
        nodes.push(Node::split(split.feature_idx, split.threshold));

        let left_idx = self.build_node(left, depth + 1, nodes, rng);
        let right_idx = self.build_node(right, depth + 1, nodes, rng);

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        current_idx
    }

    /// Features considered at one node, in ascending order
    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let wanted = (self.config.max_features * self.feature_count as f64).ceil() as usize;
        let wanted = wanted.clamp(1, self.feature_count.max(1));
        if wanted >= self.feature_count {
            return (0..self.feature_count).collect();
        }
        let mut chosen = sample(rng, self.feature_count, wanted).into_vec();
        chosen.sort_unstable();
        chosen
    }

    fn find_best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let (g_total, h_total) = self.sum_gradients_hessians(indices);
        let parent_score = score(g_total, h_total);
        let min_gain = MIN_RELATIVE_GAIN * (1.0 + parent_score.abs());
        let min_leaf = self.config.min_samples_leaf.max(1);
        let n = indices.len();

        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64, f64)> = Vec::with_capacity(n);

        for feature_idx in self.candidate_features(rng) {
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.features[i][feature_idx], self.gradients[i], self.hessians[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            let mut last_bin = usize::MAX;

            for pos in 0..n - 1 {
                g_left += column[pos].1;
                h_left += column[pos].2;

                let (x, x_next) = (column[pos].0, column[pos + 1].0);
                if x == x_next {
                    continue;
                }
                let left_count = pos + 1;
                if left_count < min_leaf || n - left_count < min_leaf {
                    continue;
                }
                let bin = left_count * self.config.max_bins / n;
                if bin == last_bin {
                    continue;
                }
                last_bin = bin;

                let gain = score(g_left, h_left) + score(g_total - g_left, h_total - h_left)
                    - parent_score;
                if gain.is_nan() || gain <= min_gain {
                    continue;
                }

                let mut threshold = x + (x_next - x) / 2.0;
                if threshold >= x_next {
                    threshold = x;
                }
                let candidate = SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                };
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn sum_gradients_hessians(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &i| {
            (g + self.gradients[i], h + self.hessians[i])
        })
    }

    /// Optimal leaf value: -G/H
    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let (g, h) = self.sum_gradients_hessians(indices);
        if h <= 0.0 {
            return 0.0;
        }
        -g / h
    }
}

/// Split score G²/H
fn score(g: f64, h: f64) -> f64 {
    if h > 0.0 {
        g * g / h
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fit(features: &[Vec<f64>], targets: &[f64], config: TreeConfig) -> Tree {
        let gradients: Vec<f64> = targets.iter().map(|y| -y).collect();
        let hessians = vec![1.0; targets.len()];
        let indices: Vec<usize> = (0..targets.len()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        CartBuilder::new(features, &gradients, &hessians, config).build(&indices, &mut rng)
    }

    #[test]
    fn test_step_function_is_recovered() {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 0.0]).collect();
        let targets = [1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];

        let tree = fit(&features, &targets, TreeConfig::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.nodes[0].feature, 0);
        assert_eq!(tree.nodes[0].threshold, 3.5);
        assert_eq!(tree.evaluate(&[2.0, 0.0]), 1.0);
        assert_eq!(tree.evaluate(&[6.0, 0.0]), 5.0);
    }

    #[test]
    fn test_leaf_only_tree() {
        let tree = fit(&[vec![1.0]], &[7.0], TreeConfig::default());
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].value, Some(7.0));
    }

    #[test]
    fn test_constant_target_does_not_split() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let tree = fit(&features, &[3.0; 10], TreeConfig::default());
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.evaluate(&[4.0]), 3.0);
    }

    #[test]
    fn test_depth_and_leaf_size_limits() {
        let features: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..32).map(|i| (i * i) as f64).collect();

        let shallow = fit(
            &features,
            &targets,
            TreeConfig {
                max_depth: 2,
                ..TreeConfig::default()
            },
        );
        assert!(shallow.depth() <= 2);

        let coarse = fit(
            &features,
            &targets,
            TreeConfig {
                min_samples_leaf: 8,
                ..TreeConfig::default()
            },
        );
        assert!(coarse.n_leaves() <= 4);
    }

    #[test]
    fn test_build_is_deterministic() {
        let features: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64, i as f64])
            .collect();
        let targets: Vec<f64> = (0..50).map(|i| ((i % 7) * 3 + (i % 5)) as f64).collect();
        let config = TreeConfig {
            max_features: 0.5,
            ..TreeConfig::default()
        };
        assert_eq!(
            fit(&features, &targets, config.clone()),
            fit(&features, &targets, config)
        );
    }
}
