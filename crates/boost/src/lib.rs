//! CTR Boost - deterministic boosted-tree classifier
//!
//! Trains gradient boosted decision trees for binary targets with native
//! categorical features (ordered target statistics), class weighting and
//! early stopping, and persists models as canonical JSON.
//!
//! The training pipeline treats this crate as an opaque library: it builds a
//! [`Pool`], fits a [`GbdtClassifier`], scores with [`Model::predict_proba`],
//! reads [`Model::feature_importance`] and saves with [`Model::save_json`].
//! Nothing else in the crate is part of that contract.
//!
//! ```rust,no_run
//! use ctr_boost::{BoostingParams, GbdtClassifier, Pool};
//!
//! # fn main() -> ctr_boost::Result<()> {
//! let names = vec!["color".to_string()];
//! let columns = vec![vec!["red".to_string(), "blue".to_string()]];
//! let pool = Pool::new(names.clone(), columns, vec![1, 0], &names)?;
//!
//! let model = GbdtClassifier::new(BoostingParams::default()).fit(&pool, None)?;
//! let probabilities = model.predict_proba(&pool)?;
//! model.save_json("model.json")?;
//! # let _ = probabilities;
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod deterministic;
pub mod early_stopping;
pub mod encoding;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod pool;
pub mod quantize;
pub mod serde_canon;
pub mod tree;
pub mod trainer;

pub use deterministic::LcgRng;
pub use errors::{BoostError, Result};
pub use metrics::{log_loss, roc_auc};
pub use model::{FeatureImportance, Model, ModelMetadata};
pub use pool::{FeatureColumn, Pool};
pub use trainer::{BoostingParams, GbdtClassifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
