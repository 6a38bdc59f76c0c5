// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Predictive Model Results
// ─────────────────────────────────────────────────────────────────────
//! Result types for the self-refusing predictive models.
//!
//! Every result carries the nullable output alongside the confidence
//! and explanation that justify it. `method == InsufficientData`
//! always implies the nullable output is `None`; the constructors in
//! `verity-core::predict` uphold this.

use serde::{Deserialize, Serialize};

/// How a model result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMethod {
    /// Closed-form smoothing/statistics over the series.
    Ml,
    /// Fixed weighted factor table.
    RuleBased,
    /// The model refused to produce an output.
    InsufficientData,
}

/// Two-sided prediction interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Nominal coverage, e.g. 0.95.
    pub level: f64,
}

/// Time-series forecast outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub prediction: Option<f64>,
    /// 0–100.
    pub confidence: f64,
    pub explanation: String,
    pub method: ModelMethod,
    pub data_quality_score: f64,
    pub confidence_interval: Option<ConfidenceInterval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Raw indicators behind a trend call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendIndicators {
    pub historical_average: f64,
    pub recent_average: f64,
    pub change_percentage: f64,
    /// Share of consecutive recent pairs moving with the trend, 0–1.
    pub consistency: f64,
}

/// Trend detector outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub trend: Option<TrendDirection>,
    /// 0–100.
    pub confidence: f64,
    pub explanation: String,
    pub method: ModelMethod,
    pub data_quality_score: f64,
    pub indicators: Option<TrendIndicators>,
}

/// One named contributor to a probability estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityFactor {
    pub name: String,
    /// Normalized impact, 0–1.
    pub impact: f64,
    /// Fixed weight; the weights of one estimator sum to 1.
    pub weight: f64,
    pub description: String,
}

impl ProbabilityFactor {
    pub fn contribution(&self) -> f64 {
        self.impact * self.weight
    }
}

/// Churn/delay estimator outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResult {
    /// 0–1.
    pub probability: Option<f64>,
    /// 0–100.
    pub confidence: f64,
    pub explanation: String,
    pub method: ModelMethod,
    pub data_quality_score: f64,
    pub factors: Vec<ProbabilityFactor>,
}
