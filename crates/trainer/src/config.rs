//! Pipeline configuration
//!
//! Loaded from TOML. Only the data and model paths lack defaults; they must
//! come from the file or from command-line overrides before `validate` passes.

use std::path::{Path, PathBuf};

use ctr_boost::BoostingParams;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::features::{DAY_WEEKDAYS, MORNING_HOURS, NIGHT_HOURS};

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Input data configuration
    #[serde(default)]
    pub data: DataConfig,
    /// Model artifact configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Boosting and split configuration
    #[serde(default)]
    pub training: TrainingConfig,
    /// Time-bucket configuration
    #[serde(default)]
    pub features: FeatureConfig,
}

/// Input data configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Delimited input file with a header row
    pub path: Option<PathBuf>,
    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Where the fitted model is written; overwritten on every run
    pub path: Option<PathBuf>,
}

/// Boosting and split configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub depth: usize,
    pub l2_leaf_reg: f64,
    pub border_count: usize,
    /// Rounds without validation AUC improvement before stopping (0 disables)
    pub early_stopping_rounds: usize,
    /// Share of each class held out for validation
    pub validation_fraction: f64,
    /// Multiplier on the negative/positive ratio used as the positive class weight
    pub positive_weight_factor: f64,
    pub seed: u64,
    /// Boosting progress line every N rounds (0 disables)
    pub log_period: usize,
    /// Number of features in the importance report
    pub top_features: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            learning_rate: 0.03,
            depth: 10,
            l2_leaf_reg: 3.0,
            border_count: 254,
            early_stopping_rounds: 100,
            validation_fraction: 0.2,
            positive_weight_factor: 0.5,
            seed: 42,
            log_period: 100,
            top_features: 10,
        }
    }
}

/// Time-bucket membership sets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    pub night_hours: Vec<i64>,
    pub morning_hours: Vec<i64>,
    /// Weekdays counted from Monday = 0
    pub day_weekdays: Vec<i64>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            night_hours: NIGHT_HOURS.to_vec(),
            morning_hours: MORNING_HOURS.to_vec(),
            day_weekdays: DAY_WEEKDAYS.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Configuration with default training settings for the given paths
    pub fn new(data_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            data: DataConfig {
                path: Some(data_path.into()),
                ..DataConfig::default()
            },
            model: ModelConfig {
                path: Some(model_path.into()),
            },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Relative data and model paths are resolved against the directory
    /// holding the file, so a run does not depend on the working directory.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base) = path.parent() {
            config.data.path = config.data.path.map(|p| resolve(base, p));
            config.model.path = config.model.path.map(|p| resolve(base, p));
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("invalid configuration: {}", e)))
    }

    /// Reject configurations that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        self.data_path()?;
        self.model_path()?;
        self.delimiter()?;

        let t = &self.training;
        if t.iterations == 0 {
            return Err(PipelineError::Config("iterations must be positive".into()));
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(PipelineError::Config(
                "learning_rate must be a positive number".into(),
            ));
        }
        if t.depth == 0 || t.depth > 16 {
            return Err(PipelineError::Config("depth must be in 1..=16".into()));
        }
        if !(t.l2_leaf_reg.is_finite() && t.l2_leaf_reg >= 0.0) {
            return Err(PipelineError::Config(
                "l2_leaf_reg must be non-negative".into(),
            ));
        }
        if t.border_count == 0 || t.border_count >= usize::from(u16::MAX) {
            return Err(PipelineError::Config(
                "border_count must be in 1..65535".into(),
            ));
        }
        if !(t.validation_fraction > 0.0 && t.validation_fraction < 1.0) {
            return Err(PipelineError::Config(
                "validation_fraction must be strictly between 0 and 1".into(),
            ));
        }
        if !(t.positive_weight_factor.is_finite() && t.positive_weight_factor > 0.0) {
            return Err(PipelineError::Config(
                "positive_weight_factor must be positive".into(),
            ));
        }

        let f = &self.features;
        check_members("night_hours", &f.night_hours, 23)?;
        check_members("morning_hours", &f.morning_hours, 23)?;
        check_members("day_weekdays", &f.day_weekdays, 6)?;
        Ok(())
    }

    pub fn data_path(&self) -> Result<&Path> {
        self.data
            .path
            .as_deref()
            .ok_or_else(|| PipelineError::Config("no data path configured".into()))
    }

    pub fn model_path(&self) -> Result<&Path> {
        self.model
            .path
            .as_deref()
            .ok_or_else(|| PipelineError::Config("no model path configured".into()))
    }

    /// Delimiter as the byte the CSV reader expects
    pub fn delimiter(&self) -> Result<u8> {
        let c = self.data.delimiter;
        if c.is_ascii() && c != '\n' && c != '\r' && c != '"' {
            Ok(c as u8)
        } else {
            Err(PipelineError::Config(format!(
                "unsupported delimiter {:?}",
                c
            )))
        }
    }

    /// Booster settings for a given positive class weight
    pub fn boosting_params(&self, positive_weight: f64) -> BoostingParams {
        let t = &self.training;
        BoostingParams {
            iterations: t.iterations,
            learning_rate: t.learning_rate,
            depth: t.depth,
            l2_leaf_reg: t.l2_leaf_reg,
            border_count: t.border_count,
            early_stopping_rounds: (t.early_stopping_rounds > 0).then_some(t.early_stopping_rounds),
            class_weights: Some([1.0, positive_weight]),
            random_seed: t.seed,
            log_period: t.log_period,
            ..BoostingParams::default()
        }
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn check_members(name: &str, values: &[i64], max: i64) -> Result<()> {
    match values.iter().find(|v| !(0..=max).contains(*v)) {
        Some(v) => Err(PipelineError::Config(format!(
            "{} contains {} outside 0..={}",
            name, v, max
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_follow_pipeline_settings() {
        let config = PipelineConfig::new("data.csv", "model.json");
        assert!(config.validate().is_ok());
        assert_eq!(config.training.iterations, 1000);
        assert_eq!(config.training.depth, 10);
        assert_eq!(config.training.early_stopping_rounds, 100);
        assert_eq!(config.features.morning_hours, vec![6, 7, 8, 9]);

        let params = config.boosting_params(2.5);
        assert_eq!(params.class_weights, Some([1.0, 2.5]));
        assert_eq!(params.early_stopping_rounds, Some(100));
        assert!((params.learning_rate - 0.03).abs() < f64::EPSILON);
    }

    #[test]
    fn test_paths_required() {
        let config = PipelineConfig::default();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [data]
            path = "/data/train.csv"
            delimiter = ";"

            [model]
            path = "/models/ctr.json"

            [training]
            iterations = 50
            early_stopping_rounds = 0
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.delimiter().unwrap(), b';');
        assert_eq!(config.training.iterations, 50);
        assert_eq!(config.training.learning_rate, 0.03);
        assert_eq!(config.boosting_params(1.0).early_stopping_rounds, None);
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = PipelineConfig::from_toml_str(include_str!("../../../config/ctr.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.training, TrainingConfig::default());
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = PipelineConfig::from_toml_str("[training]\nrounds = 3\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::new("d.csv", "m.json");
        config.training.validation_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::new("d.csv", "m.json");
        config.features.day_weekdays = vec![7];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::new("d.csv", "m.json");
        config.data.delimiter = '"';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ctr.toml");
        std::fs::write(
            &path,
            "[data]\npath = \"train.csv\"\n[model]\npath = \"/abs/model.json\"\n",
        )
        .unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.data_path().unwrap(), dir.path().join("train.csv"));
        assert_eq!(config.model_path().unwrap(), Path::new("/abs/model.json"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = PipelineConfig::load_from_file("/nonexistent/ctr.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
