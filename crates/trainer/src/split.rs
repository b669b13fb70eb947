//! Stratified train/validation split

use ctr_boost::LcgRng;
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Hold out `validation_fraction` of each class
///
/// Per class, `round(count * fraction)` rows are held out, clamped so both
/// partitions see every class. Deterministic for a fixed seed.
pub fn stratified_split(labels: &[u8], validation_fraction: f64, seed: u64) -> Result<StratifiedSplit> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(PipelineError::FitFailure(format!(
            "validation fraction {} must be strictly between 0 and 1",
            validation_fraction
        )));
    }

    let mut rng = LcgRng::new(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();

    for class in [0u8, 1] {
        let mut rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if rows.len() < 2 {
            return Err(PipelineError::FitFailure(format!(
                "class {} has {} rows; a stratified split needs at least 2 per class",
                class,
                rows.len()
            )));
        }

        let held_out = ((rows.len() as f64 * validation_fraction).round() as usize)
            .clamp(1, rows.len() - 1);
        rng.shuffle(&mut rows);
        debug!("Class {}: {} train / {} validation", class, rows.len() - held_out, held_out);

        validation.extend_from_slice(&rows[..held_out]);
        train.extend_from_slice(&rows[held_out..]);
    }

    if train.len() + validation.len() != labels.len() {
        return Err(PipelineError::FitFailure(
            "labels must be 0 or 1 for a stratified split".to_string(),
        ));
    }

    let positive_rate = |rows: &[usize]| {
        rows.iter().filter(|&&i| labels[i] == 1).count() as f64 / rows.len() as f64
    };
    if positive_rate(&validation) < 0.01 {
        warn!(
            "Validation set is highly imbalanced ({:.4} positive rate)",
            positive_rate(&validation)
        );
    }

    train.sort_unstable();
    validation.sort_unstable();
    Ok(StratifiedSplit { train, validation })
}
