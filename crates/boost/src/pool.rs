//! Column-oriented training/evaluation pool
//!
//! A pool holds named feature columns plus optional 0/1 labels. Columns are
//! supplied as text; those declared categorical stay text, the rest must parse
//! as `f64`.

use std::collections::BTreeSet;

use crate::errors::{BoostError, Result};

/// A single feature column
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureColumn {
    Categorical(Vec<String>),
    Numeric(Vec<f64>),
}

impl FeatureColumn {
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Categorical(values) => values.len(),
            FeatureColumn::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureColumn::Categorical(_))
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            FeatureColumn::Categorical(values) => {
                FeatureColumn::Categorical(indices.iter().map(|&i| values[i].clone()).collect())
            }
            FeatureColumn::Numeric(values) => {
                FeatureColumn::Numeric(indices.iter().map(|&i| values[i]).collect())
            }
        }
    }
}

/// Feature matrix with optional binary labels
#[derive(Clone, Debug)]
pub struct Pool {
    feature_names: Vec<String>,
    columns: Vec<FeatureColumn>,
    labels: Option<Vec<u8>>,
    n_rows: usize,
}

impl Pool {
    /// Build a labelled pool. Every name in `cat_features` must be a column.
    pub fn new(
        feature_names: Vec<String>,
        columns: Vec<Vec<String>>,
        labels: Vec<u8>,
        cat_features: &[String],
    ) -> Result<Self> {
        let mut pool = Self::build(feature_names, columns, labels.len(), cat_features)?;
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(BoostError::InvalidLabel(format!(
                "expected 0 or 1, found {bad}"
            )));
        }
        pool.labels = Some(labels);
        Ok(pool)
    }

    /// Build a pool without labels, for scoring only.
    pub fn unlabeled(
        feature_names: Vec<String>,
        columns: Vec<Vec<String>>,
        cat_features: &[String],
    ) -> Result<Self> {
        let n_rows = columns.first().map(Vec::len).unwrap_or(0);
        Self::build(feature_names, columns, n_rows, cat_features)
    }

    fn build(
        feature_names: Vec<String>,
        columns: Vec<Vec<String>>,
        n_rows: usize,
        cat_features: &[String],
    ) -> Result<Self> {
        if feature_names.len() != columns.len() {
            return Err(BoostError::FeatureMismatch(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                columns.len()
            )));
        }
        if n_rows == 0 || columns.is_empty() {
            return Err(BoostError::EmptyDataset);
        }

        let mut seen = BTreeSet::new();
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(BoostError::DuplicateFeature(name.clone()));
            }
        }
        if let Some(unknown) = cat_features.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(BoostError::UnknownFeature(unknown.clone()));
        }

        let mut typed = Vec::with_capacity(columns.len());
        for (name, values) in feature_names.iter().zip(columns) {
            if values.len() != n_rows {
                return Err(BoostError::ShapeMismatch {
                    name: name.clone(),
                    expected: n_rows,
                    actual: values.len(),
                });
            }

            if cat_features.iter().any(|c| c == name) {
                typed.push(FeatureColumn::Categorical(values));
            } else {
                let mut parsed = Vec::with_capacity(n_rows);
                for (row, value) in values.iter().enumerate() {
                    let number = value
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| BoostError::InvalidFeature {
                            name: name.clone(),
                            row,
                            value: value.clone(),
                        })?;
                    parsed.push(number);
                }
                typed.push(FeatureColumn::Numeric(parsed));
            }
        }

        Ok(Self {
            feature_names,
            columns: typed,
            labels: None,
            n_rows,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Check if the pool has no rows
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn labels(&self) -> Option<&[u8]> {
        self.labels.as_deref()
    }

    /// Names of the categorical columns, in column order
    pub fn categorical_features(&self) -> Vec<&str> {
        self.feature_names
            .iter()
            .zip(&self.columns)
            .filter(|(_, c)| c.is_categorical())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Count of positive labels (0 for an unlabeled pool)
    pub fn positive_count(&self) -> usize {
        self.labels
            .as_ref()
            .map(|l| l.iter().filter(|&&v| v == 1).count())
            .unwrap_or(0)
    }

    /// Row subset in the given order
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(BoostError::EmptyDataset);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(BoostError::ShapeMismatch {
                name: "<row index>".to_string(),
                expected: self.n_rows,
                actual: bad + 1,
            });
        }

        Ok(Self {
            feature_names: self.feature_names.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
            labels: self
                .labels
                .as_ref()
                .map(|l| indices.iter().map(|&i| l[i]).collect()),
            n_rows: indices.len(),
        })
    }
}
