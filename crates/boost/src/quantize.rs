//! Feature quantization into histogram bins
//!
//! Split candidates are restricted to a per-feature list of borders. A value
//! falls in bin `k` when exactly `k` borders are strictly below it, so
//! `value <= borders[k]` holds iff `bin <= k`.

/// Compute at most `border_count` ascending borders for a feature.
pub fn compute_borders(values: &[f64], border_count: usize) -> Vec<f64> {
    if values.is_empty() || border_count == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < 2 {
        return Vec::new();
    }

    if distinct.len() - 1 <= border_count {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    // Too many distinct values: place borders on quantiles of the data
    let max = distinct[distinct.len() - 1];
    let n = sorted.len();
    let mut borders: Vec<f64> = (1..=border_count)
        .map(|k| sorted[(k * n / (border_count + 1)).min(n - 1)])
        .filter(|&b| b < max)
        .collect();
    borders.dedup();
    borders
}

/// Bin index of a single value
pub fn bin_value(value: f64, borders: &[f64]) -> u16 {
    borders.partition_point(|&b| b < value) as u16
}

/// Bin every value of a column
pub fn bin_column(values: &[f64], borders: &[f64]) -> Vec<u16> {
    values.iter().map(|&v| bin_value(v, borders)).collect()
}
