// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Series Statistics
// ─────────────────────────────────────────────────────────────────────
//! Small, allocation-light statistics shared by the predictive models
//! and the anomaly refusal condition. Empty input yields `0.0` or an
//! empty result, never a panic.

/// Quality score below which every model refuses.
pub const MIN_QUALITY_SCORE: f64 = 50.0;

/// Sample count at which the small-sample penalty disappears.
const FULL_SAMPLE: usize = 12;

/// CV below which a series counts as flat.
pub const FLAT_CV: f64 = 0.01;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// `σ / |μ|`; `0.0` when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values).abs();
    if m < f64::EPSILON {
        return 0.0;
    }
    std_dev(values) / m
}

/// Linear-interpolated quantile of an already sorted slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// First and third quartiles.
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
}

/// Indices of values outside the 1.5×IQR Tukey fences.
pub fn iqr_outliers(values: &[f64]) -> Vec<usize> {
    if values.len() < 4 {
        return Vec::new();
    }
    let (q1, q3) = quartiles(values);
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < lo || **v > hi)
        .map(|(i, _)| i)
        .collect()
}

/// Share of values outside the IQR fences, 0–100.
pub fn outlier_percentage(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    iqr_outliers(values).len() as f64 / values.len() as f64 * 100.0
}

/// Quality of a series as model input, 0–100.
///
/// Starts at 100; a flat series loses 60, each IQR outlier 10 (at most
/// 30), and each sample short of twelve costs 3.
pub fn data_quality_score(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut score = 100.0;
    if coefficient_of_variation(values) < FLAT_CV {
        score -= 60.0;
    }
    score -= (iqr_outliers(values).len() as f64 * 10.0).min(30.0);
    if values.len() < FULL_SAMPLE {
        score -= (FULL_SAMPLE - values.len()) as f64 * 3.0;
    }
    score.clamp(0.0, 100.0)
}
