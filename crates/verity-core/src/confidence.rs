// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Confidence Calculator (Additive Penalty Model)
// ─────────────────────────────────────────────────────────────────────
//! Reproducible confidence scoring for computed insights.
//!
//! Every data-quality problem subtracts a fixed, documented penalty
//! from the caller's base confidence. The result is clamped to
//! `[0, MAX_CONFIDENCE]` and rounded. The calculator never fails and
//! never reads external state; the same inputs always give the same
//! score.
//!
//! What to do with the score is the caller's business, but every call
//! site in this crate goes through [`ConfidencePolicy`]: below the
//! refusal threshold the candidate insight is discarded.

use serde::{Deserialize, Serialize};

use verity_types::confidence::clamp_score;
use verity_types::{ConfidenceFactors, InsightStatus, ValidationContext, VerityConfig, MAX_CONFIDENCE};

/// One applied deduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub label: String,
    pub amount: f64,
}

/// Full trace of a confidence computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub base: f64,
    pub penalties: Vec<Penalty>,
    /// `base - Σ penalties`, before clamping.
    pub raw: f64,
    pub confidence: u8,
}

/// Replace a non-finite input with the value that penalizes most.
#[inline]
fn finite_or(value: f64, worst: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        log::warn!("confidence factor was non-finite, scoring as worst case {worst}");
        worst
    }
}

impl ConfidenceBreakdown {
    pub fn compute(base: f64, factors: &ConfidenceFactors) -> Self {
        let mut penalties = Vec::new();
        let mut push = |label: String, amount: f64| {
            if amount > 0.0 {
                penalties.push(Penalty { label, amount });
            }
        };

        let missing = finite_or(factors.missing_data_percentage, 100.0).clamp(0.0, 100.0);
        push(format!("{missing:.1}% of data missing"), missing * 0.5);

        if let Some(ratio) = factors.data_completeness_ratio {
            let ratio = finite_or(ratio, 0.0).clamp(0.0, 1.0);
            push(format!("data completeness {:.0}%", ratio * 100.0), (1.0 - ratio) * 20.0);
        }

        if factors.has_manual_overrides {
            push("manual overrides present".to_string(), 15.0);
        }
        if factors.has_backdated_entries {
            push("backdated entries present".to_string(), 10.0);
        }

        let freshness = finite_or(factors.data_freshness_days, f64::MAX);
        if freshness > 30.0 {
            let amount = (freshness / 30.0 * 10.0).min(20.0);
            let label = if freshness == f64::MAX {
                "data age unknown".to_string()
            } else {
                format!("data is {freshness:.0} days old")
            };
            push(label, amount);
        }

        if factors.sample_size < 10 {
            push(
                format!("only {} samples", factors.sample_size),
                (10 - factors.sample_size) as f64 * 2.0,
            );
        }

        if let Some(anomaly) = factors.anomaly_percentage {
            let anomaly = finite_or(anomaly, 100.0);
            if anomaly > 30.0 {
                push(format!("{anomaly:.1}% anomalous values"), 25.0);
            } else if anomaly > 15.0 {
                push(format!("{anomaly:.1}% anomalous values"), 10.0);
            }
        }

        if let Some(cv) = factors.variance_stability {
            let cv = finite_or(cv, f64::MAX);
            if cv > 1.0 {
                push("highly unstable series".to_string(), 15.0);
            } else if cv > 0.5 {
                push("moderately unstable series".to_string(), 8.0);
            }
        }

        if let Some(months) = factors.historical_coverage {
            let months = finite_or(months, 0.0);
            if months < 3.0 {
                push(format!("only {months:.1} months of history"), 20.0);
            } else if months < 6.0 {
                push(format!("only {months:.1} months of history"), 10.0);
            }
        }

        let total: f64 = penalties.iter().map(|p| p.amount).sum();
        let raw = base - total;
        let confidence = clamp_score(raw, 0.0, MAX_CONFIDENCE as f64).round() as u8;
        Self {
            base,
            penalties,
            raw,
            confidence,
        }
    }

    /// Prose rendering for `Insight::confidence_reason`.
    pub fn reason(&self) -> String {
        let mut out = format!("Confidence {}% from base {:.0}", self.confidence, self.base);
        if self.penalties.is_empty() {
            out.push_str("; no data-quality penalties applied");
        } else {
            let parts: Vec<String> = self
                .penalties
                .iter()
                .map(|p| format!("-{:.1} for {}", p.amount, p.label))
                .collect();
            out.push_str(": ");
            out.push_str(&parts.join(", "));
        }
        if self.raw > MAX_CONFIDENCE as f64 {
            out.push_str(&format!("; capped at {MAX_CONFIDENCE}"));
        }
        out.push('.');
        out
    }
}

/// Score `base` (0–100) against the data-quality factors.
///
/// Always returns a value in `[0, 95]`.
pub fn calculate_confidence(base: f64, factors: &ConfidenceFactors) -> u8 {
    ConfidenceBreakdown::compute(base, factors).confidence
}

/// Fold what the contract validator learned into caller-supplied
/// factors. Only ever makes the factors more pessimistic.
pub fn absorb_context(factors: &mut ConfidenceFactors, context: &ValidationContext) {
    factors.missing_data_percentage = factors
        .missing_data_percentage
        .max(context.missing_data_percentage);
    if let Some(anomaly) = context.anomaly_percentage {
        factors.anomaly_percentage = Some(factors.anomaly_percentage.map_or(anomaly, |a| a.max(anomaly)));
    }
    factors.sample_size = factors.sample_size.min(context.legitimate_records);
    if let Some(range) = context.time_range {
        let months = range.months();
        factors.historical_coverage =
            Some(factors.historical_coverage.map_or(months, |m| m.min(months)));
    }
}

/// What the caller must do with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Discard the candidate and emit a refusal.
    Refuse,
    Degraded,
    Success,
}

/// Mandatory reporting policy applied at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidencePolicy {
    refusal_threshold: u8,
    success_threshold: u8,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::from_config(&VerityConfig::default())
    }
}

impl ConfidencePolicy {
    pub fn from_config(config: &VerityConfig) -> Self {
        Self {
            refusal_threshold: config.refusal_threshold,
            success_threshold: config.success_threshold,
        }
    }

    pub fn refusal_threshold(&self) -> u8 {
        self.refusal_threshold
    }

    pub fn classify(&self, confidence: u8) -> Verdict {
        if confidence < self.refusal_threshold {
            Verdict::Refuse
        } else if confidence < self.success_threshold {
            Verdict::Degraded
        } else {
            Verdict::Success
        }
    }

    /// Status for a reportable score; `None` when it must be refused.
    pub fn status_for(&self, confidence: u8) -> Option<InsightStatus> {
        match self.classify(confidence) {
            Verdict::Refuse => None,
            Verdict::Degraded => Some(InsightStatus::Degraded),
            Verdict::Success => Some(InsightStatus::Success),
        }
    }
}
