//! LightGBM text model evaluator
//!
//! Reads the text dump written by `Booster.save_model()` and evaluates it.
//! The supported subset is what a single-output regression booster needs:
//! numerical splits with missing-value routing, categorical bitset splits,
//! the pandas category mappings appended to the file, and the identity or
//! exponential output transform.

use crate::features::{FeatureVector, CATEGORICAL_COLUMNS, FEATURE_COLUMNS, FIRST_CATEGORICAL};
use super::Regressor;
use std::collections::HashMap;

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;
const MISSING_ZERO: u8 = 1;
const MISSING_NAN: u8 = 2;
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputTransform {
    Identity,
    Exp,
}

impl OutputTransform {
    fn from_objective(objective: &str) -> Result<Self, String> {
        // The objective line may carry parameters, e.g. "tweedie tweedie_variance_power:1.5"
        let name = objective.split_whitespace().next().unwrap_or("");
        match name {
            "regression" | "regression_l2" | "regression_l1" | "l2" | "l1" | "mse" | "mae"
            | "huber" | "fair" | "quantile" | "mape" => Ok(OutputTransform::Identity),
            "poisson" | "gamma" | "tweedie" => Ok(OutputTransform::Exp),
            other => Err(format!("unsupported objective '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
    cat_boundaries: Vec<usize>,
    cat_threshold: Vec<u32>,
}

fn parse_list<T: std::str::FromStr>(fields: &HashMap<&str, &str>, key: &str) -> Result<Vec<T>, String> {
    match fields.get(key) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split_whitespace()
            .map(|v| v.parse::<T>().map_err(|_| format!("bad value '{}' in {}", v, key)))
            .collect(),
    }
}

fn in_bitset(bits: &[u32], pos: u32) -> bool {
    let word = (pos / 32) as usize;
    word < bits.len() && (bits[word] >> (pos % 32)) & 1 == 1
}

impl Tree {
    fn parse(fields: &HashMap<&str, &str>, num_features: usize) -> Result<Self, String> {
        let num_leaves: usize = fields
            .get("num_leaves")
            .ok_or("tree without num_leaves")?
            .trim()
            .parse()
            .map_err(|_| "bad num_leaves".to_string())?;

        if fields.get("is_linear").map(|v| v.trim()) == Some("1") {
            return Err("linear trees are not supported".into());
        }

        let tree = Tree {
            split_feature: parse_list(fields, "split_feature")?,
            threshold: parse_list(fields, "threshold")?,
            decision_type: parse_list(fields, "decision_type")?,
            left_child: parse_list(fields, "left_child")?,
            right_child: parse_list(fields, "right_child")?,
            leaf_value: parse_list(fields, "leaf_value")?,
            cat_boundaries: parse_list(fields, "cat_boundaries")?,
            cat_threshold: parse_list(fields, "cat_threshold")?,
        };
        tree.validate(num_leaves, num_features)?;
        Ok(tree)
    }

    /// Check every index `output` may follow so evaluation never goes out of bounds
    fn validate(&self, num_leaves: usize, num_features: usize) -> Result<(), String> {
        if num_leaves == 0 || self.leaf_value.len() != num_leaves {
            return Err(format!("expected {} leaf values, found {}", num_leaves, self.leaf_value.len()));
        }
        let internal = num_leaves - 1;
        for (name, len) in [
            ("split_feature", self.split_feature.len()),
            ("threshold", self.threshold.len()),
            ("decision_type", self.decision_type.len()),
            ("left_child", self.left_child.len()),
            ("right_child", self.right_child.len()),
        ] {
            if len != internal {
                return Err(format!("{} has {} entries, expected {}", name, len, internal));
            }
        }

        for node in 0..internal {
            if self.split_feature[node] >= num_features {
                return Err(format!("split on unknown feature {}", self.split_feature[node]));
            }
            for child in [self.left_child[node], self.right_child[node]] {
                let ok = if child >= 0 {
                    (child as usize) < internal
                } else {
                    (!child as usize) < num_leaves
                };
                if !ok {
                    return Err(format!("child {} out of range", child));
                }
            }
            if self.decision_type[node] & CATEGORICAL_MASK != 0 {
                let cat_idx = self.threshold[node] as usize;
                if cat_idx + 1 >= self.cat_boundaries.len()
                    || self.cat_boundaries[cat_idx + 1] > self.cat_threshold.len()
                    || self.cat_boundaries[cat_idx] > self.cat_boundaries[cat_idx + 1]
                {
                    return Err(format!("categorical split {} has no bitset", cat_idx));
                }
            }
        }
        Ok(())
    }

    fn decide(&self, fval: f64, node: usize) -> i32 {
        let decision = self.decision_type[node];
        if decision & CATEGORICAL_MASK != 0 {
            self.categorical_decision(fval, node)
        } else {
            self.numerical_decision(fval, node, decision)
        }
    }

    fn numerical_decision(&self, fval: f64, node: usize, decision: u8) -> i32 {
        let missing = (decision >> 2) & 3;
        let mut fval = fval;
        if fval.is_nan() && missing != MISSING_NAN {
            fval = 0.0;
        }
        let is_zero = (-ZERO_THRESHOLD..=ZERO_THRESHOLD).contains(&fval);
        if (missing == MISSING_ZERO && is_zero) || (missing == MISSING_NAN && fval.is_nan()) {
            return if decision & DEFAULT_LEFT_MASK != 0 {
                self.left_child[node]
            } else {
                self.right_child[node]
            };
        }
        if fval <= self.threshold[node] {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }

    fn categorical_decision(&self, fval: f64, node: usize) -> i32 {
        // Missing and negative categories always go right
        if fval.is_nan() || fval < 0.0 {
            return self.right_child[node];
        }
        let cat_idx = self.threshold[node] as usize;
        let start = self.cat_boundaries[cat_idx];
        let end = self.cat_boundaries[cat_idx + 1];
        if in_bitset(&self.cat_threshold[start..end], fval as u32) {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }

    fn output(&self, row: &[f64]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }
        let mut node: i32 = 0;
        while node >= 0 {
            let idx = node as usize;
            node = self.decide(row[self.split_feature[idx]], idx);
        }
        self.leaf_value[!node as usize]
    }
}

/// A parsed gradient-boosted tree ensemble
#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    transform: OutputTransform,
    average_output: bool,
    /// Category universe of each categorical column, as seen during training
    categories: Option<Vec<Vec<String>>>,
}

impl Booster {
    pub fn from_text(text: &str) -> Result<Self, String> {
        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut average_output = false;
        let mut tree_blocks: Vec<HashMap<&str, &str>> = Vec::new();
        let mut current: Option<HashMap<&str, &str>> = None;
        let mut pandas_categorical: Option<&str> = None;
        let mut in_trees = false;

        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("pandas_categorical:") {
                pandas_categorical = Some(rest);
                continue;
            }
            if line.starts_with("Tree=") {
                if let Some(block) = current.take() {
                    tree_blocks.push(block);
                }
                current = Some(HashMap::new());
                in_trees = true;
                continue;
            }
            if line == "end of trees" {
                if let Some(block) = current.take() {
                    tree_blocks.push(block);
                }
                in_trees = false;
                continue;
            }
            if line == "average_output" && !in_trees {
                average_output = true;
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match current.as_mut() {
                Some(block) if in_trees => {
                    block.insert(key, value);
                }
                _ if tree_blocks.is_empty() && !in_trees => {
                    header.entry(key).or_insert(value);
                }
                _ => {}
            }
        }
        if let Some(block) = current.take() {
            tree_blocks.push(block);
        }

        let feature_names: Vec<&str> = header
            .get("feature_names")
            .ok_or("missing feature_names")?
            .split_whitespace()
            .collect();
        if feature_names != FEATURE_COLUMNS {
            return Err(format!(
                "feature schema mismatch: model expects [{}]",
                feature_names.join(", ")
            ));
        }

        if let Some(n) = header.get("num_tree_per_iteration") {
            if n.trim() != "1" {
                return Err("only single-output models are supported".into());
            }
        }

        let transform = OutputTransform::from_objective(header.get("objective").copied().unwrap_or("regression"))?;

        if tree_blocks.is_empty() {
            return Err("model contains no trees".into());
        }
        let trees = tree_blocks
            .iter()
            .enumerate()
            .map(|(i, block)| Tree::parse(block, FEATURE_COLUMNS.len()).map_err(|e| format!("tree {}: {}", i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let categories = match pandas_categorical.map(str::trim) {
            None | Some("null") | Some("") => None,
            Some(raw) => Some(parse_categories(raw)?),
        };

        Ok(Self {
            trees,
            transform,
            average_output,
            categories,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Category code of `value` in categorical column `column`; NaN when the
    /// value was not seen in training
    fn category_code(&self, column: usize, value: &str) -> f64 {
        match &self.categories {
            Some(lists) => lists[column]
                .iter()
                .position(|c| c == value)
                .map(|p| p as f64)
                .unwrap_or(f64::NAN),
            // Without pandas mappings the model was trained on integer codes
            None => value.trim().parse::<i64>().map(|v| v as f64).unwrap_or(f64::NAN),
        }
    }

    fn encode(&self, features: &FeatureVector) -> [f64; 16] {
        let mut row = [0.0; 16];
        row[..FIRST_CATEGORICAL].copy_from_slice(&features.numeric_values());
        for (i, value) in features.categorical_values().iter().enumerate() {
            row[FIRST_CATEGORICAL + i] = self.category_code(i, value);
        }
        row
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut raw: f64 = self.trees.iter().map(|t| t.output(row)).sum();
        if self.average_output {
            raw /= self.trees.len() as f64;
        }
        match self.transform {
            OutputTransform::Identity => raw,
            OutputTransform::Exp => raw.exp(),
        }
    }
}

fn parse_categories(raw: &str) -> Result<Vec<Vec<String>>, String> {
    let lists: Vec<Vec<serde_json::Value>> =
        serde_json::from_str(raw).map_err(|e| format!("bad pandas_categorical: {}", e))?;
    if lists.len() != CATEGORICAL_COLUMNS.len() {
        return Err(format!(
            "expected {} category lists, found {}",
            CATEGORICAL_COLUMNS.len(),
            lists.len()
        ));
    }
    Ok(lists
        .into_iter()
        .map(|list| {
            list.into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

impl Regressor for Booster {
    fn predict(&self, features: &FeatureVector) -> f64 {
        self.predict_row(&self.encode(features))
    }
}
