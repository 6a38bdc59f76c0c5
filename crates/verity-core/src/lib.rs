// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Contract validation, confidence scoring, self-refusing predictive
//! models, decision audit, and the insight cache.
//!
//! Engines hand raw records to the [`InsightGate`]; the gate decides
//! whether a number may be shown, how confident it is, and records why.
//!
//! # Correctness Invariants
//!
//! 1. **Refusal is a first-class result**: `insufficient_data` and
//!    `error` insights always carry `value == None` and `confidence == 0`.
//!    No code path fills in a placeholder number.
//!
//! 2. **Confidence is capped**: every score lies in `[0, 95]`. Non-finite
//!    factors are scored as their worst case, never propagated.
//!
//! 3. **One decision, one entry**: every terminal path through the gate
//!    (success, degraded, refusal, error) appends exactly one entry to
//!    the decision sink. A panicking computation is caught and recorded as
//!    an error like any other failure. Failing to mirror that entry to the log stream
//!    never rolls the append back.
//!
//! 4. **The cache never recomputes**: a miss returns `None`; the owning
//!    engine recomputes and re-populates. Domain events only remove.

pub mod audit;
pub mod cache;
pub mod clock;
pub mod confidence;
pub mod contract;
pub mod events;
pub mod gate;
pub mod predict;

pub use audit::{DecisionSink, InMemoryDecisionLog, JsonlDecisionLog};
pub use cache::{CacheEntry, CacheKey, InsightCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use confidence::{
    absorb_context, calculate_confidence, ConfidenceBreakdown, ConfidencePolicy, Penalty, Verdict,
};
pub use contract::{
    validate, validate_partitioned, BusinessRule, ContractBuilder, CorrectnessContract, Exclusion,
    LegitimacyRule, MinimumThreshold, RefusalCondition, ThresholdKind,
};
pub use events::{
    CacheInvalidator, DomainEvent, EventBus, EventBusBuilder, EventSubscriber, Module,
    MutationKind,
};
pub use gate::{Computation, EngineRun, InsightGate, InsightRequest, Outcome};
pub use predict::{
    detect_trend, estimate_churn, estimate_delay, forecast, ChurnSignals, ForecastOptions,
    ProbabilityOptions, ProjectSignals, TrendOptions,
};
