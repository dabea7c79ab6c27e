//! Base learners of the stacking ensemble

use serde::{Deserialize, Serialize};

/// Logistic function, stable for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression: P(1) = sigmoid(coef . x + intercept)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn n_inputs(&self) -> usize {
        self.coef.len()
    }

    pub fn proba(&self, x: &[f64]) -> f64 {
        let z: f64 = self.coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.intercept;
        sigmoid(z)
    }
}

/// One node of a flattened decision tree. Children always come after their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class-1 probability at this leaf
    Leaf { proba: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Check the node list forms a forward-only tree over `n_features` inputs.
    pub fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split { feature, threshold, left, right } => {
                    if feature >= n_features {
                        return Err(format!("node {} splits on feature {} of {}", i, feature, n_features));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} points to invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { proba } => {
                    if !(0.0..=1.0).contains(&proba) {
                        return Err(format!("leaf {} has probability {} outside [0, 1]", i, proba));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk from the root to a leaf. Requires a tree that passed `check`.
    pub fn proba(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { proba } => return proba,
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Level-0 estimator of the stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseEstimator {
    Logistic(LogisticRegression),
    Tree(DecisionTree),
}

impl BaseEstimator {
    pub fn proba(&self, x: &[f64]) -> f64 {
        match self {
            BaseEstimator::Logistic(model) => model.proba(x),
            BaseEstimator::Tree(tree) => tree.proba(x),
        }
    }

    pub fn check(&self, n_features: usize) -> Result<(), String> {
        match self {
            BaseEstimator::Logistic(model) if model.n_inputs() != n_features => Err(format!(
                "logistic estimator has {} coefficients, expected {}",
                model.n_inputs(),
                n_features
            )),
            BaseEstimator::Logistic(_) => Ok(()),
            BaseEstimator::Tree(tree) => tree.check(n_features),
        }
    }
}

/// Per-feature standardization: (x - mean) / scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, x: &mut [f64]) {
        for ((v, m), s) in x.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split { feature: 1, threshold: 10.0, left: 1, right: 2 },
                TreeNode::Leaf { proba: 0.2 },
                TreeNode::Leaf { proba: 0.9 },
            ],
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(50.0) > 0.999);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_proba() {
        let model = LogisticRegression { coef: vec![1.0, -1.0], intercept: 0.0 };
        assert_eq!(model.proba(&[3.0, 3.0]), 0.5);
        assert!(model.proba(&[5.0, 0.0]) > 0.99);
    }

    #[test]
    fn test_tree_walk_uses_less_or_equal() {
        let tree = stump();
        assert!(tree.check(2).is_ok());
        assert_eq!(tree.proba(&[0.0, 10.0]), 0.2);
        assert_eq!(tree.proba(&[0.0, 10.5]), 0.9);
    }

    #[test]
    fn test_tree_check_rejects_bad_nodes() {
        assert!(stump().check(1).is_err());

        let backwards = DecisionTree {
            nodes: vec![
                TreeNode::Leaf { proba: 0.1 },
                TreeNode::Split { feature: 0, threshold: 1.0, left: 0, right: 0 },
            ],
        };
        assert!(backwards.check(1).is_err());

        let bad_leaf = DecisionTree { nodes: vec![TreeNode::Leaf { proba: 1.2 }] };
        assert!(bad_leaf.check(1).is_err());

        assert!(DecisionTree { nodes: vec![] }.check(1).is_err());
    }

    #[test]
    fn test_estimator_deserialize() {
        let json = r#"{"kind":"tree","nodes":[{"node":"leaf","proba":0.3}]}"#;
        let estimator: BaseEstimator = serde_json::from_str(json).unwrap();
        assert_eq!(estimator.proba(&[]), 0.3);

        let json = r#"{"kind":"logistic","coef":[0.5]}"#;
        let estimator: BaseEstimator = serde_json::from_str(json).unwrap();
        assert!(estimator.check(1).is_ok());
        assert!(estimator.check(2).is_err());
    }

    #[test]
    fn test_scaler() {
        let scaler = StandardScaler { mean: vec![1.0, 10.0], scale: vec![2.0, 5.0] };
        let mut x = [3.0, 0.0];
        scaler.transform(&mut x);
        assert_eq!(x, [1.0, -2.0]);
    }
}
