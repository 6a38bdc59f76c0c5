// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Contract Validation Results
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::insight::TimeRange;

/// Facts gathered while a dataset is checked against its contract.
/// Returned for audit and for downstream confidence scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub total_records: usize,
    pub legitimate_records: usize,
    pub excluded_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<BTreeMap<String, usize>>,
    /// Share of legitimate records missing a required field, 0–100.
    pub missing_data_percentage: f64,
    /// Share of values flagged as outliers by a refusal condition, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_percentage: Option<f64>,
}

/// Outcome of checking a dataset against a correctness contract.
///
/// `legitimate_count + excluded_count == context.total_records`.
/// `failure_reason` is `Some` exactly when `passed` is false, and is
/// always prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub context: ValidationContext,
    pub legitimate_count: usize,
    pub excluded_count: usize,
}

impl ContractResult {
    pub fn pass(context: ValidationContext) -> Self {
        Self {
            passed: true,
            failure_reason: None,
            legitimate_count: context.legitimate_records,
            excluded_count: context.excluded_count,
            context,
        }
    }

    pub fn fail(reason: impl Into<String>, context: ValidationContext) -> Self {
        Self {
            passed: false,
            failure_reason: Some(reason.into()),
            legitimate_count: context.legitimate_records,
            excluded_count: context.excluded_count,
            context,
        }
    }
}
