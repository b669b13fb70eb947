//! Gradient boosted classifier trainer
//!
//! Logistic-loss boosting over depth-wise CART trees. Categorical columns are
//! turned into ordered target statistics, every feature is quantized into
//! histogram bins, and an optional validation pool drives early stopping on
//! ROC-AUC. With a validation pool the returned ensemble is truncated to its
//! best round.

use tracing::{debug, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::early_stopping::{EarlyStopAction, EarlyStopping};
use crate::encoding::{CtrTable, FeatureEncoding};
use crate::errors::{BoostError, Result};
use crate::metrics::{roc_auc, sigmoid};
use crate::model::{Model, ModelMetadata, MODEL_FORMAT_VERSION};
use crate::pool::{FeatureColumn, Pool};
use crate::quantize::{bin_column, compute_borders};

/// Lower bound on per-row hessians, keeps leaf values finite on saturated rows
const MIN_HESSIAN: f64 = 1e-16;

/// Boosting configuration
#[derive(Clone, Debug)]
pub struct BoostingParams {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    pub l2_leaf_reg: f64,
    pub border_count: usize,
    pub min_samples_leaf: usize,
    /// Stop after this many rounds without validation AUC improvement
    pub early_stopping_rounds: Option<usize>,
    /// Row weights for labels 0 and 1
    pub class_weights: Option<[f64; 2]>,
    pub random_seed: u64,
    /// Emit an info line every `log_period` rounds (0 disables)
    pub log_period: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            iterations: 1000,
            learning_rate: 0.03,
            depth: 6,
            l2_leaf_reg: 3.0,
            border_count: 254,
            min_samples_leaf: 1,
            early_stopping_rounds: None,
            class_weights: None,
            random_seed: 0,
            log_period: 100,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BoostError::InvalidParams(msg));

        if self.iterations == 0 {
            return invalid("iterations must be positive".to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid(format!("learning rate {} must be positive", self.learning_rate));
        }
        if self.depth == 0 || self.depth > 16 {
            return invalid(format!("depth {} outside 1..=16", self.depth));
        }
        if !(self.l2_leaf_reg >= 0.0 && self.l2_leaf_reg.is_finite()) {
            return invalid(format!("l2_leaf_reg {} must be non-negative", self.l2_leaf_reg));
        }
        if self.border_count == 0 || self.border_count >= u16::MAX as usize {
            return invalid(format!("border_count {} outside 1..65535", self.border_count));
        }
        if self.early_stopping_rounds == Some(0) {
            return invalid("early_stopping_rounds must be positive".to_string());
        }
        if let Some(weights) = self.class_weights {
            if weights.iter().any(|w| !(*w > 0.0 && w.is_finite())) {
                return invalid(format!("class weights {weights:?} must be positive"));
            }
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.depth,
            min_samples_leaf: self.min_samples_leaf,
            l2_leaf_reg: self.l2_leaf_reg,
            learning_rate: self.learning_rate,
        }
    }
}

/// Boosted-tree binary classifier
pub struct GbdtClassifier {
    params: BoostingParams,
}

impl GbdtClassifier {
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Fit on `train`, optionally tracking `eval` for early stopping
    pub fn fit(&self, train: &Pool, eval: Option<&Pool>) -> Result<Model> {
        self.params.validate()?;

        let labels = train
            .labels()
            .ok_or_else(|| BoostError::InvalidLabel("training pool has no labels".to_string()))?;
        let n_rows = labels.len();
        if n_rows == 0 {
            return Err(BoostError::EmptyDataset);
        }
        let positives = train.positive_count();
        if positives == 0 {
            return Err(BoostError::SingleClass(0));
        }
        if positives == n_rows {
            return Err(BoostError::SingleClass(1));
        }

        let eval_labels = match eval {
            Some(pool) => {
                if pool.feature_names() != train.feature_names() {
                    return Err(BoostError::FeatureMismatch(
                        "evaluation pool columns differ from training pool".to_string(),
                    ));
                }
                Some(pool.labels().ok_or_else(|| {
                    BoostError::InvalidLabel("evaluation pool has no labels".to_string())
                })?)
            }
            None => None,
        };

        let class_weights = self.params.class_weights.unwrap_or([1.0, 1.0]);
        let weights: Vec<f64> = labels.iter().map(|&l| class_weights[l as usize]).collect();

        info!(
            "Fitting {} rows x {} features ({} positive), class weights {:?}",
            n_rows,
            train.feature_count(),
            positives,
            class_weights
        );

        // Encode features
        let prior = positives as f64 / n_rows as f64;
        let mut rng = LcgRng::new(self.params.random_seed);
        let order = rng.permutation(n_rows);

        let mut encodings = Vec::with_capacity(train.feature_count());
        let mut encoded_columns = Vec::with_capacity(train.feature_count());
        for column in train.columns() {
            match column {
                FeatureColumn::Categorical(values) => {
                    encoded_columns.push(CtrTable::ordered_encode(values, labels, &order, prior));
                    encodings.push(FeatureEncoding::Categorical(CtrTable::fit(values, labels, prior)));
                }
                FeatureColumn::Numeric(values) => {
                    encoded_columns.push(values.clone());
                    encodings.push(FeatureEncoding::Numeric);
                }
            }
        }

        let borders: Vec<Vec<f64>> = encoded_columns
            .iter()
            .map(|c| compute_borders(c, self.params.border_count))
            .collect();
        let bins: Vec<Vec<u16>> = encoded_columns
            .iter()
            .zip(&borders)
            .map(|(c, b)| bin_column(c, b))
            .collect();
        drop(encoded_columns);

        let mut model = Model {
            version: MODEL_FORMAT_VERSION,
            feature_names: train.feature_names().to_vec(),
            encodings,
            base_score: Self::calculate_bias(labels, &weights),
            trees: Vec::with_capacity(self.params.iterations),
            metadata: ModelMetadata {
                iterations_requested: self.params.iterations,
                best_iteration: None,
                best_score: None,
                learning_rate: self.params.learning_rate,
                depth: self.params.depth,
                class_weights,
            },
        };

        let eval_rows = match eval {
            Some(pool) => model.encode_rows(pool)?,
            None => Vec::new(),
        };

        let mut predictions = vec![model.base_score; n_rows];
        let mut eval_predictions = vec![model.base_score; eval_rows.len()];
        let mut early_stopping = EarlyStopping::new(self.params.early_stopping_rounds);
        let tree_config = self.params.tree_config();

        for round in 0..self.params.iterations {
            let (gradients, hessians) = Self::calculate_gradients_hessians(labels, &weights, &predictions);

            let grown = CartBuilder::new(&bins, &borders, &gradients, &hessians, tree_config.clone()).build();

            for (pred, delta) in predictions.iter_mut().zip(&grown.row_values) {
                *pred += delta;
            }
            for (pred, row) in eval_predictions.iter_mut().zip(&eval_rows) {
                *pred += grown.tree.evaluate(row);
            }
            debug!("Round {}: {} leaves", round, grown.tree.leaf_count());
            model.trees.push(grown.tree);

            let Some(eval_labels) = eval_labels else {
                if self.should_log(round) {
                    info!("Round {}/{}", round + 1, self.params.iterations);
                }
                continue;
            };

            let auc = roc_auc(eval_labels, &eval_predictions);
            if self.should_log(round) {
                info!(
                    "Round {}/{}: validation AUC {:.5} (best {:.5} at round {})",
                    round + 1,
                    self.params.iterations,
                    auc,
                    early_stopping.best_value().unwrap_or(auc).max(auc),
                    early_stopping.best_round()
                );
            }

            if early_stopping.update(round, auc) == EarlyStopAction::Stop {
                info!(
                    "Early stopping at round {}: no AUC improvement since round {}",
                    round,
                    early_stopping.best_round()
                );
                break;
            }
        }

        if eval.is_some() {
            let best_round = early_stopping.best_round();
            model.trees.truncate(best_round + 1);
            model.metadata.best_iteration = Some(best_round);
            model.metadata.best_score = early_stopping.best_value();
            info!(
                "Keeping {} trees (best validation AUC {:.5})",
                model.trees.len(),
                early_stopping.best_value().unwrap_or(0.5)
            );
        }

        Ok(model)
    }

    fn should_log(&self, round: usize) -> bool {
        self.params.log_period > 0
            && ((round + 1) % self.params.log_period == 0 || round + 1 == self.params.iterations)
    }

    /// Initial raw score: log-odds of the weighted positive rate
    fn calculate_bias(labels: &[u8], weights: &[f64]) -> f64 {
        let (pos, neg) = labels
            .iter()
            .zip(weights)
            .fold((0.0, 0.0), |(p, n), (&l, &w)| if l == 1 { (p + w, n) } else { (p, n + w) });

        if pos > 0.0 && neg > 0.0 {
            (pos / neg).ln()
        } else {
            0.0
        }
    }

    /// Weighted logistic-loss gradients and hessians
    /// gradient = w * (p - y), hessian = w * p * (1 - p)
    fn calculate_gradients_hessians(labels: &[u8], weights: &[f64], predictions: &[f64]) -> (Vec<f64>, Vec<f64>) {
        labels
            .iter()
            .zip(weights)
            .zip(predictions)
            .map(|((&label, &weight), &raw)| {
                let p = sigmoid(raw);
                let gradient = weight * (p - f64::from(label));
                let hessian = (weight * p * (1.0 - p)).max(MIN_HESSIAN);
                (gradient, hessian)
            })
            .unzip()
    }
}
