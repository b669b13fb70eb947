//! Pipeline reporting
//!
//! Diagnostics that the pipeline surfaces to its operator go through the
//! `Reporter` trait. The binary logs them with `tracing`; tests record them.

use std::path::{Path, PathBuf};

use ctr_boost::FeatureImportance;
use tracing::info;

/// Missing-value summary for one output column
///
/// Cleaning leaves no gaps behind, so only the filled cells are counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullCount {
    pub column: String,
    /// Cells filled with the column mode
    pub imputed: usize,
}

/// Validation-set scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub roc_auc: f64,
    pub log_loss: f64,
}

/// Receives the pipeline's operator-facing diagnostics
pub trait Reporter {
    /// Per-column count of cells imputed during cleaning
    fn null_counts(&mut self, counts: &[NullCount]);

    fn metrics(&mut self, metrics: &EvaluationMetrics);

    fn model_saved(&mut self, path: &Path, digest: &str);

    /// Highest-ranked features, best first
    fn feature_importance(&mut self, top: &[FeatureImportance]);
}

/// Reporter that writes through `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn null_counts(&mut self, counts: &[NullCount]) {
        info!("Imputed cells per column:");
        for count in counts {
            info!("  {:<24} {}", count.column, count.imputed);
        }
    }

    fn metrics(&mut self, metrics: &EvaluationMetrics) {
        info!("ROC-AUC: {:.4}", metrics.roc_auc);
        info!("Log Loss: {:.4}", metrics.log_loss);
    }

    fn model_saved(&mut self, path: &Path, digest: &str) {
        info!("Model saved to {} (blake3 {})", path.display(), digest);
    }

    fn feature_importance(&mut self, top: &[FeatureImportance]) {
        info!("Top {} features:", top.len());
        for (rank, feature) in top.iter().enumerate() {
            info!("  {:>2}. {:<24} {:.4}", rank + 1, feature.name, feature.score);
        }
    }
}

/// One recorded report
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    NullCounts(Vec<NullCount>),
    Metrics(EvaluationMetrics),
    ModelSaved { path: PathBuf, digest: String },
    FeatureImportance(Vec<FeatureImportance>),
}

/// Reporter that keeps every event in order
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub events: Vec<ReportEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded_null_counts(&self) -> Option<&[NullCount]> {
        self.events.iter().rev().find_map(|e| match e {
            ReportEvent::NullCounts(c) => Some(c.as_slice()),
            _ => None,
        })
    }

    pub fn recorded_metrics(&self) -> Option<EvaluationMetrics> {
        self.events.iter().rev().find_map(|e| match e {
            ReportEvent::Metrics(m) => Some(*m),
            _ => None,
        })
    }

    pub fn recorded_model_path(&self) -> Option<&Path> {
        self.events.iter().rev().find_map(|e| match e {
            ReportEvent::ModelSaved { path, .. } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn recorded_importance(&self) -> Option<&[FeatureImportance]> {
        self.events.iter().rev().find_map(|e| match e {
            ReportEvent::FeatureImportance(f) => Some(f.as_slice()),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn null_counts(&mut self, counts: &[NullCount]) {
        self.events.push(ReportEvent::NullCounts(counts.to_vec()));
    }

    fn metrics(&mut self, metrics: &EvaluationMetrics) {
        self.events.push(ReportEvent::Metrics(*metrics));
    }

    fn model_saved(&mut self, path: &Path, digest: &str) {
        self.events.push(ReportEvent::ModelSaved {
            path: path.to_path_buf(),
            digest: digest.to_string(),
        });
    }

    fn feature_importance(&mut self, top: &[FeatureImportance]) {
        self.events.push(ReportEvent::FeatureImportance(top.to_vec()));
    }
}
