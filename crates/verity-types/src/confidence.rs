// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Confidence Inputs
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to the nearest
/// bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.2}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.2}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Data-quality signals fed to the confidence calculator.
///
/// Pure input; recomputed per call, no identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    /// 0–100.
    pub missing_data_percentage: f64,
    pub has_manual_overrides: bool,
    pub has_backdated_entries: bool,
    /// Age of the newest record in days.
    pub data_freshness_days: f64,
    pub sample_size: usize,
    /// 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_percentage: Option<f64>,
    /// 0–1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_completeness_ratio: Option<f64>,
    /// Months of history available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_coverage: Option<f64>,
    /// Coefficient of variation of the underlying series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_stability: Option<f64>,
}

impl Default for ConfidenceFactors {
    /// A clean, fresh, adequately sized dataset: no penalty applies.
    fn default() -> Self {
        Self {
            missing_data_percentage: 0.0,
            has_manual_overrides: false,
            has_backdated_entries: false,
            data_freshness_days: 0.0,
            sample_size: 10,
            anomaly_percentage: None,
            data_completeness_ratio: None,
            historical_coverage: None,
            variance_stability: None,
        }
    }
}

/// How a final confidence was reached, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDetails {
    pub base_confidence: f64,
    pub factors: ConfidenceFactors,
    pub final_confidence: u8,
}
