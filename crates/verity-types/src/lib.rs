// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Data model, configuration, and error hierarchy for the Verity
//! Kernel, the decision-correctness gate between analytical engines
//! and the consumers that display their numbers.

pub mod config;
pub mod confidence;
pub mod decision;
pub mod error;
pub mod insight;
pub mod model;
pub mod record;
pub mod validation;

pub use config::{VerityConfig, MAX_CONFIDENCE};
pub use confidence::{clamp_score, ConfidenceDetails, ConfidenceFactors};
pub use decision::{DataSnapshot, Decision, DecisionLogEntry, NewDecision, Scope, VersionInfo};
pub use error::{VerityError, VerityResult};
pub use insight::{
    DataSource, EngineResult, EngineStatus, Insight, InsightMetadata, InsightStatus, InsightType,
    InsightValue, TimeRange,
};
pub use model::{
    ConfidenceInterval, ForecastResult, ModelMethod, ProbabilityFactor, ProbabilityResult,
    TrendDirection, TrendIndicators, TrendResult,
};
pub use record::Record;
pub use validation::{ContractResult, ValidationContext};
