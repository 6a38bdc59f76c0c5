// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Insight Types
// ─────────────────────────────────────────────────────────────────────

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VerityError, VerityResult};
use crate::model::{ConfidenceInterval, ModelMethod, ProbabilityFactor, TrendIndicators};

/// Average Gregorian month length in days.
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Provenance of a reported value. Doubles as the cache volatility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Read directly from records.
    Actual,
    /// Computed from records by a fixed formula.
    Derived,
    /// Projected by a predictive model.
    Predicted,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Actual => "actual",
            Self::Derived => "derived",
            Self::Predicted => "predicted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Success,
    Degraded,
    InsufficientData,
    Error,
}

impl InsightStatus {
    /// Whether an insight with this status carries a value.
    pub fn is_reportable(self) -> bool {
        matches!(self, Self::Success | Self::Degraded)
    }
}

/// A reported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl From<f64> for InsightValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for InsightValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for InsightValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for InsightValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

/// Where an insight's inputs came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub module: String,
    pub table: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

impl DataSource {
    pub fn new(module: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            table: table.into(),
            fields: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

/// Closed interval of time covered by a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> VerityResult<Self> {
        if end < start {
            return Err(VerityError::Validation(format!(
                "time range end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Elapsed months, using the average month length.
    pub fn months(&self) -> f64 {
        let days = (self.end - self.start).num_seconds() as f64 / 86_400.0;
        days / DAYS_PER_MONTH
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Per-kind model payload attached to an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightMetadata {
    Forecast {
        method: ModelMethod,
        periods: u32,
        data_quality_score: f64,
        confidence_interval: Option<ConfidenceInterval>,
    },
    Trend {
        method: ModelMethod,
        data_quality_score: f64,
        indicators: TrendIndicators,
    },
    Probability {
        method: ModelMethod,
        data_quality_score: f64,
        factors: Vec<ProbabilityFactor>,
    },
}

/// A single reported analytical value with its confidence, explanation,
/// and status.
///
/// `InsufficientData` and `Error` insights always have `value == None`
/// and `confidence == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub value: Option<InsightValue>,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    /// 0–95.
    pub confidence: u8,
    pub confidence_reason: String,
    pub explanation: String,
    pub data_sources: Vec<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub last_computed_at: DateTime<Utc>,
    pub status: InsightStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<InsightMetadata>,
}

impl Insight {
    /// Deliberate decision not to report a number.
    pub fn refusal(
        insight_type: InsightType,
        reason: impl Into<String>,
        explanation: impl Into<String>,
        data_sources: Vec<DataSource>,
        time_range: Option<TimeRange>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: None,
            insight_type,
            confidence: 0,
            confidence_reason: reason.into(),
            explanation: explanation.into(),
            data_sources,
            time_range,
            last_computed_at: computed_at,
            status: InsightStatus::InsufficientData,
            metadata: None,
        }
    }

    /// Unexpected failure while computing; the message is embedded in
    /// the explanation.
    pub fn error(
        insight_type: InsightType,
        message: &str,
        data_sources: Vec<DataSource>,
        time_range: Option<TimeRange>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: None,
            insight_type,
            confidence: 0,
            confidence_reason: "Computation failed; no confidence can be assigned.".to_string(),
            explanation: format!("Computation failed: {message}"),
            data_sources,
            time_range,
            last_computed_at: computed_at,
            status: InsightStatus::Error,
            metadata: None,
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.status == InsightStatus::InsufficientData
    }

    pub fn number(&self) -> Option<f64> {
        match self.value {
            Some(InsightValue::Number(n)) => Some(n),
            _ => None,
        }
    }
}

/// Aggregate status of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Every step completed (refusals included).
    Success,
    /// Some steps failed; the rest were returned.
    Partial,
    /// Every step failed.
    Failed,
}

/// Everything one engine run produced, ready to hand to an API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub insights: Vec<Insight>,
    pub engine_name: String,
    pub computed_at: DateTime<Utc>,
    pub status: EngineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}
