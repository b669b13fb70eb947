//! CTR training pipeline
//!
//! Engineers features on the cleaned table, fits the boosted-tree classifier
//! on a stratified split, evaluates it, persists the model and reports
//! feature importance.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use ctr_boost::{log_loss, roc_auc, BoostError, FeatureImportance, GbdtClassifier, Model, Pool};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::features::engineer_features;
use crate::loader::{load_and_preprocess, LoadedData};
use crate::report::{EvaluationMetrics, Reporter};
use crate::split::stratified_split;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub roc_auc: f64,
    pub log_loss: f64,
    /// Zero-based boosting round kept by early stopping
    pub best_iteration: Option<usize>,
    pub tree_count: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub positive_weight: f64,
    pub model_path: PathBuf,
    /// BLAKE3 hex digest of the saved model
    pub model_digest: String,
    /// Every feature, best first
    pub feature_importance: Vec<FeatureImportance>,
}

/// Runs the fit/evaluate/persist half of the pipeline
pub struct CtrTrainer {
    config: PipelineConfig,
}

impl CtrTrainer {
    /// Create a trainer; the configuration must validate
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured data file, then train on it
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<TrainingOutcome> {
        let data = load_and_preprocess(
            self.config.data_path()?,
            self.config.delimiter()?,
            reporter,
        )?;
        self.train(&data, reporter)
    }

    /// Train on already cleaned data
    ///
    /// The model file is written only after fit and evaluation succeed.
    pub fn train(&self, data: &LoadedData, reporter: &mut dyn Reporter) -> Result<TrainingOutcome> {
        let training = &self.config.training;

        let features = engineer_features(&data.features, &self.config.features)?;
        info!(
            "Engineered {} categorical features over {} rows",
            features.feature_names.len(),
            features.n_rows()
        );

        let pool = Pool::new(
            features.feature_names.clone(),
            features.columns.clone(),
            data.labels.clone(),
            features.categorical_features(),
        )?;

        let split = stratified_split(&data.labels, training.validation_fraction, training.seed)?;
        let train_pool = pool.subset(&split.train)?;
        let valid_pool = pool.subset(&split.validation)?;
        info!(
            "Stratified split: {} train / {} validation",
            split.train.len(),
            split.validation.len()
        );

        let positive_weight = positive_class_weight(&data.labels, training.positive_weight_factor)?;
        info!("Positive class weight: {:.4}", positive_weight);

        let classifier = GbdtClassifier::new(self.config.boosting_params(positive_weight));
        let model = classifier.fit(&train_pool, Some(&valid_pool))?;

        let probabilities = model.predict_proba(&valid_pool)?;
        let valid_labels = valid_pool
            .labels()
            .ok_or_else(|| PipelineError::FitFailure("validation pool lost its labels".into()))?;
        let metrics = EvaluationMetrics {
            roc_auc: roc_auc(valid_labels, &probabilities),
            log_loss: log_loss(valid_labels, &probabilities),
        };
        reporter.metrics(&metrics);

        let model_path = self.config.model_path()?.to_path_buf();
        let model_digest = save_model(&model, &model_path)?;
        reporter.model_saved(&model_path, &model_digest);

        let feature_importance = rank_importance(model.feature_importance());
        let top = &feature_importance[..feature_importance.len().min(training.top_features)];
        reporter.feature_importance(top);

        Ok(TrainingOutcome {
            roc_auc: metrics.roc_auc,
            log_loss: metrics.log_loss,
            best_iteration: model.metadata.best_iteration,
            tree_count: model.num_trees(),
            train_rows: split.train.len(),
            validation_rows: split.validation.len(),
            positive_weight,
            model_path,
            model_digest,
            feature_importance,
        })
    }
}

/// `negatives / positives * factor`, counted over all labels
pub fn positive_class_weight(labels: &[u8], factor: f64) -> Result<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(PipelineError::FitFailure(format!(
            "need both classes to weight positives ({} positive, {} negative)",
            positives, negatives
        )));
    }
    let weight = negatives as f64 / positives as f64 * factor;
    if weight < 1.0 {
        warn!("Positive class weight {:.4} down-weights the positive class", weight);
    }
    Ok(weight)
}

/// Sort by descending score, ties broken by name
pub fn rank_importance(mut importance: Vec<FeatureImportance>) -> Vec<FeatureImportance> {
    importance.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    importance
}

/// Write the model, creating the parent directory; returns its digest
fn save_model(model: &Model, path: &Path) -> Result<String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    model.save_json(path).map_err(|err| match err {
        BoostError::Io(source) => PipelineError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => PipelineError::from(other),
    })?;

    let digest = model.hash_hex()?;
    info!("Saved {} trees to {}", model.num_trees(), path.display());
    Ok(digest)
}
