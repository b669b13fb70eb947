//! Binary classification metrics

/// Probability clamp used by [`log_loss`]
pub const LOG_LOSS_EPS: f64 = 1e-15;

/// Area under the ROC curve.
///
/// Computed from the rank-sum of the positives with averaged ranks for tied
/// scores. Returns 0.5 when only one class is present. Any monotone transform
/// of `scores` gives the same value, so raw margins can be passed directly.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> f64 {
    let n = labels.len().min(scores.len());

    let n_pos = labels[..n].iter().filter(|&&l| l == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[indices[j]] == scores[indices[i]] {
            j += 1;
        }

        // Ranks are 1-based; tied block i..j shares the average rank
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let positives_in_block = indices[i..j].iter().filter(|&&idx| labels[idx] == 1).count();
        rank_sum_pos += avg_rank * positives_in_block as f64;

        i = j;
    }

    let n_pos_f = n_pos as f64;
    let n_neg_f = n_neg as f64;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg_f)
}

/// Mean binary cross-entropy of `probabilities` against `labels`.
pub fn log_loss(labels: &[u8], probabilities: &[f64]) -> f64 {
    let n = labels.len().min(probabilities.len());
    if n == 0 {
        return 0.0;
    }

    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&l, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if l == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();

    total / n as f64
}

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn auc_perfect() {
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]);
        assert!((auc - 1.0).abs() < TOL);
    }

    #[test]
    fn auc_worst() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]);
        assert!(auc.abs() < TOL);
    }

    #[test]
    fn auc_all_tied_is_half() {
        let auc = roc_auc(&[0, 1, 0, 1], &[0.5; 4]);
        assert!((auc - 0.5).abs() < TOL);
    }

    #[test]
    fn auc_known_value() {
        // Pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) lose,
        // (0.8 vs 0.1) win, (0.8 vs 0.4) win -> 3/4
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]);
        assert!((auc - 0.75).abs() < TOL);
    }

    #[test]
    fn auc_single_class() {
        assert_eq!(roc_auc(&[1, 1, 1], &[0.1, 0.2, 0.3]), 0.5);
        assert_eq!(roc_auc(&[], &[]), 0.5);
    }

    #[test]
    fn logloss_matches_formula() {
        let ll = log_loss(&[1, 0], &[0.8, 0.3]);
        let expected = -(0.8f64.ln() + 0.7f64.ln()) / 2.0;
        assert!((ll - expected).abs() < TOL);
    }

    #[test]
    fn logloss_clamps_extremes() {
        let ll = log_loss(&[1, 0], &[0.0, 1.0]);
        assert!(ll.is_finite());
        assert!(ll > 30.0);
        assert_eq!(log_loss(&[], &[]), 0.0);
    }

    #[test]
    fn sigmoid_is_symmetric() {
        assert!((sigmoid(0.0) - 0.5).abs() < TOL);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < TOL);
    }
}
