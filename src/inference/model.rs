//! Regression model abstraction and the XGBoost JSON model reader

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// A fitted regression model: one raw score per input row.
///
/// Implementations are shared read-only between concurrent pipeline calls.
pub trait Regressor: Send + Sync {
    /// Raw model output for each row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of input columns the model expects
    fn n_features(&self) -> usize;

    /// Feature names stored with the model, if any
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

/// A node of a boosted regression tree
#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Leaf {
        value: f32,
    },
    Split {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    /// Inputs are compared in single precision; missing values take the default branch
    fn predict(&self, sample: &[f64]) -> f32 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split { feature, threshold, default_left, left, right } => {
                let x = sample[*feature];
                let go_left = if x.is_nan() { *default_left } else { (x as f32) < *threshold };
                if go_left {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split { feature, left, right, .. } => {
                Some(*feature).max(left.max_feature()).max(right.max_feature())
            }
        }
    }
}

// XGBoost's JSON model layout. Only the fields needed for prediction are read.

#[derive(Deserialize)]
struct ModelFile {
    learner: LearnerJson,
}

#[derive(Deserialize)]
struct LearnerJson {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBoosterJson,
    learner_model_param: LearnerModelParam,
    #[serde(default)]
    objective: Option<ObjectiveJson>,
}

#[derive(Deserialize)]
struct GradientBoosterJson {
    #[serde(default)]
    name: Option<String>,
    model: GbTreeJson,
}

#[derive(Deserialize)]
struct GbTreeJson {
    trees: Vec<TreeJson>,
}

#[derive(Deserialize)]
struct TreeJson {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<FlagJson>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: NumberJson,
    #[serde(default)]
    num_feature: Option<NumberJson>,
}

#[derive(Deserialize)]
struct ObjectiveJson {
    name: String,
}

/// XGBoost writes most numeric parameters as strings (`"5E-1"`, `"[7.5E0]"`)
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberJson {
    Number(f64),
    Text(String),
}

impl NumberJson {
    fn value(&self) -> std::result::Result<f64, String> {
        match self {
            NumberJson::Number(v) => Ok(*v),
            NumberJson::Text(s) => {
                let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
                trimmed
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("invalid number {:?}: {}", s, e))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagJson {
    Bool(bool),
    Int(i64),
}

impl FlagJson {
    fn is_set(&self) -> bool {
        match self {
            FlagJson::Bool(b) => *b,
            FlagJson::Int(i) => *i != 0,
        }
    }
}

impl TreeJson {
    fn build(&self) -> std::result::Result<TreeNode, String> {
        let n = self.left_children.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if [
            self.right_children.len(),
            self.split_indices.len(),
            self.split_conditions.len(),
            self.default_left.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays have inconsistent lengths".into());
        }
        self.node(0, 0)
    }

    fn node(&self, id: usize, depth: usize) -> std::result::Result<TreeNode, String> {
        // a well-formed tree never nests deeper than its node count
        if depth > self.left_children.len() {
            return Err("tree contains a cycle".into());
        }

        let left = self.left_children[id];
        if left == -1 {
            return Ok(TreeNode::Leaf { value: self.split_conditions[id] });
        }

        let child = |c: i64| {
            usize::try_from(c)
                .ok()
                .filter(|&c| c < self.left_children.len())
                .ok_or_else(|| format!("node {} has invalid child {}", id, c))
        };
        let feature = usize::try_from(self.split_indices[id])
            .map_err(|_| format!("node {} has negative split index", id))?;

        Ok(TreeNode::Split {
            feature,
            threshold: self.split_conditions[id],
            default_left: self.default_left[id].is_set(),
            left: Box::new(self.node(child(left)?, depth + 1)?),
            right: Box::new(self.node(child(self.right_children[id])?, depth + 1)?),
        })
    }
}

/// Gradient-boosted trees read from XGBoost's JSON model format
#[derive(Debug, Clone)]
pub struct XGBoostModel {
    trees: Vec<TreeNode>,
    base_score: f32,
    n_features: usize,
    feature_names: Vec<String>,
    objective: Option<String>,
}

impl XGBoostModel {
    /// Load a model saved with `Booster.save_model("model.json")`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ForecastError::artifact(path, e))?;
        let model = Self::from_json_str(&json).map_err(|e| ForecastError::artifact(path, e))?;

        info!(
            path = %path.display(),
            trees = model.trees.len(),
            features = model.n_features,
            base_score = model.base_score,
            "Loaded XGBoost model"
        );
        Ok(model)
    }

    /// Parse a model from its JSON text
    pub fn from_json_str(json: &str) -> std::result::Result<Self, String> {
        let file: ModelFile = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let learner = file.learner;

        if let Some(name) = learner.gradient_booster.name.as_deref() {
            if name != "gbtree" {
                return Err(format!("unsupported booster {:?}", name));
            }
        }

        let trees = learner
            .gradient_booster
            .model
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| t.build().map_err(|e| format!("tree {}: {}", i, e)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let base_score = learner.learner_model_param.base_score.value()? as f32;

        let used = trees.iter().filter_map(TreeNode::max_feature).max().map_or(0, |m| m + 1);
        let declared = match &learner.learner_model_param.num_feature {
            Some(n) => n.value()? as usize,
            None => learner.feature_names.len(),
        };
        let n_features = declared.max(used);

        let objective = learner.objective.map(|o| o.name);
        if let Some(name) = objective.as_deref() {
            if !name.starts_with("reg:") || name == "reg:logistic" {
                warn!(objective = name, "Model objective is not an identity-link regression");
            }
        }

        Ok(Self {
            trees,
            base_score,
            n_features,
            feature_names: learner.feature_names,
            objective,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    fn predict_row(&self, sample: &[f64]) -> f32 {
        let sum: f32 = self.trees.iter().map(|t| t.predict(sample)).sum();
        self.base_score + sum
    }
}

impl Regressor for XGBoostModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(ForecastError::ShapeError {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = Array1::zeros(x.nrows());
        let mut row_buf = vec![0.0; x.ncols()];
        for (i, row) in x.rows().into_iter().enumerate() {
            for (slot, v) in row_buf.iter_mut().zip(row.iter()) {
                *slot = *v;
            }
            out[i] = self.predict_row(&row_buf) as f64;
        }
        Ok(out)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(&self.feature_names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// One stump on feature 1 at 0.5, plus a single-leaf tree
    const STUMPS: &str = r#"{
        "learner": {
            "feature_names": ["a", "b"],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "trees": [
                        {
                            "left_children": [1, -1, -1],
                            "right_children": [2, -1, -1],
                            "split_indices": [1, 0, 0],
                            "split_conditions": [0.5, -1.0, 2.0],
                            "default_left": [0, 0, 0]
                        },
                        {
                            "left_children": [-1],
                            "right_children": [-1],
                            "split_indices": [0],
                            "split_conditions": [0.25],
                            "default_left": [false]
                        }
                    ]
                }
            },
            "learner_model_param": {"base_score": "5E-1", "num_feature": "2"},
            "objective": {"name": "reg:squarederror"}
        },
        "version": [1, 7, 6]
    }"#;

    #[test]
    fn test_parse_and_predict() {
        let model = XGBoostModel::from_json_str(STUMPS).unwrap();
        assert_eq!(model.n_trees(), 2);
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.feature_names().unwrap(), &["a".to_string(), "b".to_string()]);

        let x = array![[0.0, 0.0], [0.0, 1.0], [0.0, 0.5]];
        let out = model.predict(&x).unwrap();
        assert_eq!(out.to_vec(), vec![-0.25, 2.75, 2.75]);
    }

    #[test]
    fn test_missing_value_takes_default_branch() {
        let model = XGBoostModel::from_json_str(STUMPS).unwrap();
        let out = model.predict(&array![[0.0, f64::NAN]]).unwrap();
        // default_left is 0, so NaN goes right
        assert_eq!(out[0], 2.75);
    }

    #[test]
    fn test_bracketed_base_score() {
        let json = STUMPS.replace("\"5E-1\"", "\"[7.5E0]\"");
        let model = XGBoostModel::from_json_str(&json).unwrap();
        assert_eq!(model.base_score(), 7.5);
    }

    #[test]
    fn test_column_mismatch() {
        let model = XGBoostModel::from_json_str(STUMPS).unwrap();
        let err = model.predict(&array![[0.0, 1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, ForecastError::ShapeError { .. }));
    }

    #[test]
    fn test_malformed_tree_rejected() {
        let json = STUMPS.replace("\"right_children\": [2, -1, -1]", "\"right_children\": [7, -1, -1]");
        assert!(XGBoostModel::from_json_str(&json).is_err());
        let json = STUMPS.replace("\"left_children\": [1, -1, -1]", "\"left_children\": [0, -1, -1]");
        assert!(XGBoostModel::from_json_str(&json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = XGBoostModel::load("/nonexistent/xgb_model.json").unwrap_err();
        assert!(matches!(err, ForecastError::ArtifactLoad { .. }));
    }
}
