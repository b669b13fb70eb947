//! Feature engineering
//!
//! Pure functions over a cleaned table: time-bucket flags, pairwise
//! interaction columns, and the conversion of everything to text for the
//! categorical booster.

use crate::config::FeatureConfig;
use crate::errors::{PipelineError, Result};
use crate::loader::{HOUR_COLUMN, WEEKDAY_COLUMN};
use crate::table::{Column, FeatureTable, Value};

pub const NIGHT_HOURS: [i64; 2] = [0, 1];
pub const MORNING_HOURS: [i64; 4] = [6, 7, 8, 9];
/// Monday, Tuesday, Sunday
pub const DAY_WEEKDAYS: [i64; 3] = [0, 1, 6];

pub const IS_NIGHT: &str = "is_night";
pub const IS_MORNING: &str = "is_morning";
pub const IS_DAY: &str = "is_day";

pub const INTERACTION_SEPARATOR: &str = "_";

/// (output name, left source, right source)
pub const INTERACTIONS: [(&str, &str, &str); 4] = [
    ("product_campaign", "product", "campaign_id"),
    ("gender_age", "gender", "age_level"),
    ("product_webpage", "product", "webpage_id"),
    ("campaign_webpage", "campaign_id", "webpage_id"),
];

/// Text columns ready for the booster, all categorical
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredFeatures {
    pub feature_names: Vec<String>,
    pub columns: Vec<Vec<String>>,
}

impl EngineeredFeatures {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Every column is declared categorical
    pub fn categorical_features(&self) -> &[String] {
        &self.feature_names
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }
}

/// Add flags and interactions, then cast every column to text
///
/// Output order: input columns, `is_night`, `is_morning`, `is_day`, then the
/// interactions in declaration order.
pub fn engineer_features(table: &FeatureTable, buckets: &FeatureConfig) -> Result<EngineeredFeatures> {
    let mut engineered = table.clone();

    let hour = table.require(HOUR_COLUMN)?;
    let weekday = table.require(WEEKDAY_COLUMN)?;
    engineered.push_column(bucket_flags(hour, &buckets.night_hours, IS_NIGHT)?)?;
    engineered.push_column(bucket_flags(hour, &buckets.morning_hours, IS_MORNING)?)?;
    engineered.push_column(bucket_flags(weekday, &buckets.day_weekdays, IS_DAY)?)?;

    for (name, left, right) in INTERACTIONS {
        engineered.push_column(interaction_column(table, name, left, right)?)?;
    }

    let (feature_names, columns) = engineered
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.to_text()))
        .unzip();
    Ok(EngineeredFeatures {
        feature_names,
        columns,
    })
}

/// 1 where the integer value of `source` is in `members`, else 0
pub fn bucket_flags(source: &Column, members: &[i64], name: &str) -> Result<Column> {
    let values = source
        .values
        .iter()
        .map(|v| -> Result<Value> {
            let n = v.as_int().ok_or_else(|| {
                PipelineError::Parse(format!(
                    "column `{}` holds non-integer value `{}`",
                    source.name, v
                ))
            })?;
            Ok(Value::Int(i64::from(members.contains(&n))))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Column::new(name, values))
}

/// Row-wise `left_right` concatenation of two columns' text
pub fn interaction_column(table: &FeatureTable, name: &str, left: &str, right: &str) -> Result<Column> {
    let l = table.require(left)?;
    let r = table.require(right)?;
    let values = l
        .values
        .iter()
        .zip(&r.values)
        .map(|(a, b)| Value::Text(format!("{a}{INTERACTION_SEPARATOR}{b}")))
        .collect();
    Ok(Column::new(name, values))
}
