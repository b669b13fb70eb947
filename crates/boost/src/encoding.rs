//! Categorical feature encoding with ordered target statistics
//!
//! A categorical value is replaced by a smoothed click rate of its category:
//! `(positives + prior) / (count + 1)`. Training rows only see the rows that
//! precede them in a seeded permutation, so a row's own label never leaks into
//! its encoding. Scoring rows use statistics over the whole training set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pool::FeatureColumn;

/// Label counts observed for one category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStats {
    pub positives: u64,
    pub total: u64,
}

impl CategoryStats {
    fn record(&mut self, label: u8) {
        self.positives += u64::from(label);
        self.total += 1;
    }

    fn rate(&self, prior: f64) -> f64 {
        (self.positives as f64 + prior) / (self.total as f64 + 1.0)
    }
}

/// Target statistics table for a single categorical feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CtrTable {
    pub prior: f64,
    pub categories: BTreeMap<String, CategoryStats>,
}

impl CtrTable {
    /// Collect statistics over every training row
    pub fn fit(values: &[String], labels: &[u8], prior: f64) -> Self {
        let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for (value, &label) in values.iter().zip(labels) {
            categories.entry(value.clone()).or_default().record(label);
        }
        Self { prior, categories }
    }

    /// Encode a value with the full statistics; unseen categories get the prior
    pub fn encode(&self, value: &str) -> f64 {
        self.categories
            .get(value)
            .copied()
            .unwrap_or_default()
            .rate(self.prior)
    }

    /// Encode training rows using only rows earlier in `order`
    pub fn ordered_encode(values: &[String], labels: &[u8], order: &[usize], prior: f64) -> Vec<f64> {
        let mut running: BTreeMap<&str, CategoryStats> = BTreeMap::new();
        let mut encoded = vec![0.0; values.len()];

        for &row in order {
            let stats = running.entry(values[row].as_str()).or_default();
            encoded[row] = stats.rate(prior);
            stats.record(labels[row]);
        }

        encoded
    }
}

/// How a model turns one input column into numbers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoding {
    Numeric,
    Categorical(CtrTable),
}

impl FeatureEncoding {
    /// Encode a scoring column (full statistics)
    pub fn encode_column(&self, column: &FeatureColumn) -> Option<Vec<f64>> {
        match (self, column) {
            (FeatureEncoding::Numeric, FeatureColumn::Numeric(values)) => Some(values.clone()),
            (FeatureEncoding::Categorical(table), FeatureColumn::Categorical(values)) => {
                Some(values.iter().map(|v| table.encode(v)).collect())
            }
            _ => None,
        }
    }
}
