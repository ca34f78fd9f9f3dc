//! Tree ensembles: bagged random forests and gradient boosting
//!
//! Both fit CART trees with [`CartBuilder`]. Every tree draws from its own
//! RNG seeded from `(seed, tree_index)`, so a forest of `n` trees is a prefix
//! of the forest of `n + 1` trees with the same seed.

use cane_core::deterministic::xxhash64;
use cane_core::model::{GradientBoosting, RandomForest, Tree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};

fn tree_rng(seed: u64, tree_idx: usize) -> StdRng {
    StdRng::seed_from_u64(xxhash64(&[tree_idx as u64, 0x7ee5], seed))
}

/// Bagged regression trees, each fit on a bootstrap sample.
pub fn fit_forest(
    rows: &[Vec<f64>],
    targets: &[f64],
    n_estimators: usize,
    config: &TreeConfig,
    seed: u64,
) -> RandomForest {
    let n = rows.len();
    // Leaf value -G/H with g = -y, h = 1 is the mean target of the leaf.
    let gradients: Vec<f64> = targets.iter().map(|y| -y).collect();
    let hessians = vec![1.0; n];
    let builder = CartBuilder::new(rows, &gradients, &hessians, config.clone());

    let trees: Vec<Tree> = (0..n_estimators)
        .map(|tree_idx| {
            let mut rng = tree_rng(seed, tree_idx);
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let tree = builder.build(&bootstrap, &mut rng);
            debug!(
                tree = tree_idx + 1,
                depth = tree.depth(),
                leaves = tree.n_leaves(),
                "Fitted forest tree"
            );
            tree
        })
        .collect();

    RandomForest { trees }
}

/// Squared-loss gradient boosting starting from the target mean.
pub fn fit_boosting(
    rows: &[Vec<f64>],
    targets: &[f64],
    n_estimators: usize,
    learning_rate: f64,
    config: &TreeConfig,
    seed: u64,
) -> GradientBoosting {
    let n = rows.len();
    let bias = if n == 0 {
        0.0
    } else {
        targets.iter().sum::<f64>() / n as f64
    };

    let mut predictions = vec![bias; n];
    let hessians = vec![1.0; n];
    let indices: Vec<usize> = (0..n).collect();
    let mut trees = Vec::with_capacity(n_estimators);

    for tree_idx in 0..n_estimators {
        // Gradient of squared loss (up to a constant factor)
        let gradients: Vec<f64> = predictions
            .iter()
            .zip(targets)
            .map(|(p, y)| p - y)
            .collect();

        let mut rng = tree_rng(seed, tree_idx);
        let tree = CartBuilder::new(rows, &gradients, &hessians, config.clone())
            .build(&indices, &mut rng);

        for (pred, row) in predictions.iter_mut().zip(rows) {
            *pred += learning_rate * tree.evaluate(row);
        }

        debug!(
            tree = tree_idx + 1,
            depth = tree.depth(),
            "Fitted boosting round"
        );
        trees.push(tree);
    }

    GradientBoosting {
        bias,
        learning_rate,
        trees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 10) as f64, (i / 10) as f64])
            .collect();
        let targets = rows.iter().map(|r| 10.0 * r[0] + r[1]).collect();
        (rows, targets)
    }

    #[test]
    fn test_forest_is_deterministic_and_prefix_stable() {
        let (rows, targets) = dataset();
        let config = TreeConfig::default();

        let five = fit_forest(&rows, &targets, 5, &config, 42);
        let again = fit_forest(&rows, &targets, 5, &config, 42);
        let six = fit_forest(&rows, &targets, 6, &config, 42);

        assert_eq!(five, again);
        assert_eq!(five.trees[..], six.trees[..5]);
        assert_ne!(five, fit_forest(&rows, &targets, 5, &config, 7));
    }

    #[test]
    fn test_forest_fits_training_data() {
        let (rows, targets) = dataset();
        let forest = fit_forest(&rows, &targets, 20, &TreeConfig::default(), 42);
        let mae: f64 = rows
            .iter()
            .zip(&targets)
            .map(|(r, y)| (forest.predict(r) - y).abs())
            .sum::<f64>()
            / rows.len() as f64;
        assert!(mae < 5.0, "mae {}", mae);
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (rows, targets) = dataset();
        let config = TreeConfig {
            max_depth: 3,
            ..TreeConfig::default()
        };
        let model = fit_boosting(&rows, &targets, 50, 0.3, &config, 42);

        let bias_only: f64 = targets.iter().map(|y| (y - model.bias).powi(2)).sum();
        let boosted: f64 = rows
            .iter()
            .zip(&targets)
            .map(|(r, y)| (model.predict(r) - y).powi(2))
            .sum();

        assert_eq!(model.trees.len(), 50);
        assert!((model.bias - 47.5).abs() < 1e-9);
        assert!(boosted < bias_only * 0.05);
    }
}
