//! CTR Trainer - ad click-through-rate training pipeline
//!
//! Loads a raw click log, cleans it, engineers categorical features and fits
//! a deterministic boosted-tree classifier, reporting ROC-AUC, log-loss and
//! feature importance along the way.

pub mod config;
pub mod errors;
pub mod features;
pub mod loader;
pub mod report;
pub mod split;
pub mod table;
pub mod trainer;

pub use config::PipelineConfig;
pub use errors::{PipelineError, Result};
pub use features::{engineer_features, EngineeredFeatures};
pub use loader::{load_and_preprocess, load_from_reader, LoadedData};
pub use report::{EvaluationMetrics, NullCount, RecordingReporter, Reporter, TracingReporter};
pub use split::{stratified_split, StratifiedSplit};
pub use table::{Column, FeatureTable, Value};
pub use trainer::{CtrTrainer, TrainingOutcome};

/// Run the full pipeline described by `config`
pub fn run_pipeline(config: PipelineConfig, reporter: &mut dyn Reporter) -> Result<TrainingOutcome> {
    CtrTrainer::new(config)?.run(reporter)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
