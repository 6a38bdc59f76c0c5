// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Decision Log Types
// ─────────────────────────────────────────────────────────────────────
//! Immutable audit records: one per terminal decision.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceDetails;
use crate::insight::{Insight, TimeRange};
use crate::validation::ContractResult;

/// Who a decision was made for. All parts optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The terminal decision itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// A value was reported (success or degraded).
    Insight { insight: Insight },
    /// Reporting was refused; the refusal insight handed to the caller
    /// is kept alongside the reason.
    Refusal {
        refusal_reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insight: Option<Insight>,
    },
}

impl Decision {
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::Refusal { .. })
    }
}

/// Size and shape of the data the decision was based on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub total_records: usize,
    pub legitimate_records: usize,
    pub excluded_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub engine_version: String,
}

/// Everything about a decision except the identity the sink assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecision {
    pub engine: String,
    #[serde(default)]
    pub scope: Scope,
    pub decision: Decision,
    pub data_snapshot: DataSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_result: Option<ContractResult>,
    pub version: VersionInfo,
    pub confidence_details: ConfidenceDetails,
    pub reason: String,
}

/// One immutable audit record. Created once by a decision sink; never
/// updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub engine: String,
    #[serde(default)]
    pub scope: Scope,
    pub decision: Decision,
    pub data_snapshot: DataSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_result: Option<ContractResult>,
    pub version: VersionInfo,
    pub confidence_details: ConfidenceDetails,
    pub reason: String,
}

impl DecisionLogEntry {
    pub fn from_new(id: u64, timestamp: DateTime<Utc>, new: NewDecision) -> Self {
        Self {
            id,
            timestamp,
            engine: new.engine,
            scope: new.scope,
            decision: new.decision,
            data_snapshot: new.data_snapshot,
            contract_result: new.contract_result,
            version: new.version,
            confidence_details: new.confidence_details,
            reason: new.reason,
        }
    }

    /// One-line condensed form for the operational log stream.
    pub fn summary(&self) -> String {
        let kind = if self.decision.is_refusal() { "refusal" } else { "insight" };
        format!(
            "decision #{} engine={} kind={} confidence={} records={}/{}: {}",
            self.id,
            self.engine,
            kind,
            self.confidence_details.final_confidence,
            self.data_snapshot.legitimate_records,
            self.data_snapshot.total_records,
            self.reason
        )
    }
}
