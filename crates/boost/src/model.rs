//! Fitted boosted-tree classifier
//!
//! The model carries everything needed to score raw text rows: the feature
//! names, the per-feature encodings (target statistics for categorical
//! columns) and the tree ensemble. It is saved as canonical JSON so the same
//! ensemble always produces the same file and digest.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::encoding::FeatureEncoding;
use crate::errors::{BoostError, Result};
use crate::metrics::sigmoid;
use crate::pool::Pool;
use crate::serde_canon::{canonical_hash_hex, canonical_json_string};
use crate::tree::Tree;

/// Current model format version
pub const MODEL_FORMAT_VERSION: i32 = 1;

/// Training summary stored alongside the ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub iterations_requested: usize,
    /// Zero-based round with the best validation score, if one was tracked
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
    pub learning_rate: f64,
    pub depth: usize,
    pub class_weights: [f64; 2],
}

/// Importance of one input feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub version: i32,
    pub feature_names: Vec<String>,
    pub encodings: Vec<FeatureEncoding>,
    /// Initial raw score (log-odds)
    pub base_score: f64,
    pub trees: Vec<Tree>,
    pub metadata: ModelMetadata,
}

impl Model {
    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(BoostError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.feature_names.len() != self.encodings.len() {
            return Err(BoostError::ValidationFailed(format!(
                "{} feature names but {} encodings",
                self.feature_names.len(),
                self.encodings.len()
            )));
        }

        if !self.base_score.is_finite() {
            return Err(BoostError::ValidationFailed(
                "base score is not finite".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len()).map_err(|e| {
                BoostError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw score of one encoded row
    pub fn predict_raw_row(&self, encoded: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.evaluate(encoded)).sum::<f64>()
    }

    /// Encode a pool into row-major numeric features
    pub fn encode_rows(&self, pool: &Pool) -> Result<Vec<Vec<f64>>> {
        if pool.feature_names() != self.feature_names.as_slice() {
            return Err(BoostError::FeatureMismatch(format!(
                "model expects {:?}, pool has {:?}",
                self.feature_names,
                pool.feature_names()
            )));
        }

        let mut rows = vec![Vec::with_capacity(self.feature_names.len()); pool.len()];
        for ((name, encoding), column) in self
            .feature_names
            .iter()
            .zip(&self.encodings)
            .zip(pool.columns())
        {
            let encoded = encoding.encode_column(column).ok_or_else(|| {
                BoostError::FeatureMismatch(format!(
                    "feature `{name}` has a different kind than at training time"
                ))
            })?;
            for (row, value) in rows.iter_mut().zip(encoded) {
                row.push(value);
            }
        }

        Ok(rows)
    }

    /// Positive-class probability for every pool row
    pub fn predict_proba(&self, pool: &Pool) -> Result<Vec<f64>> {
        Ok(self
            .encode_rows(pool)?
            .iter()
            .map(|row| sigmoid(self.predict_raw_row(row)))
            .collect())
    }

    /// Total split gain per feature, normalized to sum to 100, in feature order
    pub fn feature_importance(&self) -> Vec<FeatureImportance> {
        let mut totals = vec![0.0f64; self.feature_names.len()];
        for node in self.trees.iter().flat_map(|t| &t.nodes) {
            if !node.is_leaf() {
                if let Some(total) = totals.get_mut(node.feature_idx as usize) {
                    *total += node.gain;
                }
            }
        }

        let sum: f64 = totals.iter().sum();
        self.feature_names
            .iter()
            .zip(totals)
            .map(|(name, total)| FeatureImportance {
                name: name.clone(),
                score: if sum > 0.0 { total * 100.0 / sum } else { 0.0 },
            })
            .collect()
    }

    /// Serialize model to canonical JSON (sorted keys)
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(canonical_json_string(self)?)
    }

    /// BLAKE3 hex digest of the canonical JSON representation
    pub fn hash_hex(&self) -> Result<String> {
        Ok(canonical_hash_hex(self)?)
    }

    /// Save model as canonical JSON, replacing any existing file
    ///
    /// The JSON is written to a temporary file in the target directory and
    /// renamed over `path`, so a failed save leaves the previous file intact.
    /// The target directory must exist.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_canonical_json()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load and validate a model from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let model: Model = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }
}
