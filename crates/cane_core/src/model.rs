//! Regression model structures and inference
//!
//! Fitted models are plain serde data so they can be stored inside a
//! [`crate::artifact::ModelArtifact`]. Training lives in `cane-trainer`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported regressor families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    Linear,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Linear => "linear",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" | "rf" => Ok(ModelKind::RandomForest),
            "gradient_boosting" | "gbdt" | "gbm" => Ok(ModelKind::GradientBoosting),
            "linear" | "linear_regression" | "ols" => Ok(ModelKind::Linear),
            other => Err(format!("unknown model kind `{}`", other)),
        }
    }
}

/// A regression tree node (internal or leaf)
///
/// Leaves carry `value`; internal nodes send `x[feature] <= threshold` left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub feature: usize,
    pub threshold: f64,
    pub left: u32,
    pub right: u32,
    pub value: Option<f64>,
}

impl Node {
    pub fn leaf(value: f64) -> Self {
        Self {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    pub fn split(feature: usize, threshold: f64) -> Self {
        Self {
            feature,
            threshold,
            left: 0,
            right: 0,
            value: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Evaluate the tree; malformed structure or short inputs evaluate to 0.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let node = match self.nodes.get(idx) {
                Some(node) => node,
                None => return 0.0,
            };

            if let Some(value) = node.value {
                return value;
            }

            let x = match features.get(node.feature) {
                Some(x) => *x,
                None => return 0.0,
            };

            idx = if x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Maximum root-to-leaf depth (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(tree: &Tree, idx: usize) -> usize {
            match tree.nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    1 + walk(tree, node.left as usize).max(walk(tree, node.right as usize))
                }
                _ => 0,
            }
        }
        walk(self, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }
}

/// Bagged ensemble; predicts the mean of its trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        sum / self.trees.len() as f64
    }

    pub fn avg_depth(&self) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: usize = self.trees.iter().map(Tree::depth).sum();
        total as f64 / self.trees.len() as f64
    }
}

/// Additive boosted ensemble: `bias + learning_rate * Σ tree(x)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub bias: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

impl GradientBoosting {
    pub fn predict(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        self.bias + self.learning_rate * boost
    }
}

/// Linear model on raw feature units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Any fitted regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Linear(LinearModel),
}

impl Regressor {
    pub fn kind(&self) -> ModelKind {
        match self {
            Regressor::RandomForest(_) => ModelKind::RandomForest,
            Regressor::GradientBoosting(_) => ModelKind::GradientBoosting,
            Regressor::Linear(_) => ModelKind::Linear,
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Regressor::RandomForest(m) => m.predict(features),
            Regressor::GradientBoosting(m) => m.predict(features),
            Regressor::Linear(m) => m.predict(features),
        }
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x[0] <= 1.0 → 10, else 20
    fn stump() -> Tree {
        let mut root = Node::split(0, 1.0);
        root.left = 1;
        root.right = 2;
        Tree {
            nodes: vec![root, Node::leaf(10.0), Node::leaf(20.0)],
        }
    }

    #[test]
    fn test_tree_evaluate() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[0.5]), 10.0);
        assert_eq!(tree.evaluate(&[1.0]), 10.0);
        assert_eq!(tree.evaluate(&[1.5]), 20.0);
        assert_eq!(tree.evaluate(&[]), 0.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_empty_tree_evaluates_to_zero() {
        assert_eq!(Tree::default().evaluate(&[1.0]), 0.0);
    }

    #[test]
    fn test_forest_mean() {
        let constant = Tree {
            nodes: vec![Node::leaf(40.0)],
        };
        let forest = RandomForest {
            trees: vec![stump(), constant],
        };
        assert_eq!(forest.predict(&[0.0]), 25.0);
        assert_eq!(forest.avg_depth(), 0.5);
    }

    #[test]
    fn test_boosting_and_linear() {
        let gb = GradientBoosting {
            bias: 100.0,
            learning_rate: 0.5,
            trees: vec![stump()],
        };
        assert_eq!(gb.predict(&[2.0]), 110.0);

        let lm = LinearModel {
            intercept: 1.0,
            coefficients: vec![2.0, -1.0],
        };
        assert_eq!(lm.predict(&[3.0, 4.0]), 3.0);
    }

    #[test]
    fn test_regressor_serde_tagging() {
        let model = Regressor::Linear(LinearModel {
            intercept: 0.0,
            coefficients: vec![1.0],
        });
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"linear\""));
        let back: Regressor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert_eq!(back.kind(), ModelKind::Linear);
    }

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("rf".parse::<ModelKind>().unwrap(), ModelKind::RandomForest);
        assert_eq!("gradient-boosting".parse::<ModelKind>().unwrap(), ModelKind::GradientBoosting);
        assert_eq!("Linear".parse::<ModelKind>().unwrap(), ModelKind::Linear);
        assert!("svm".parse::<ModelKind>().is_err());
    }
}
