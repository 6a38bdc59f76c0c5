// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Insight Gate
// ─────────────────────────────────────────────────────────────────────
//! The pipeline every analytical engine goes through before a number
//! reaches a consumer.
//!
//! ```text
//! cache hit? ──► return cached insight
//!     │
//! validate contract ──fail──► refusal (logged, not cached)
//!     │
//! compute ──Err──► status=error (logged, not cached)
//!     │   └─Refuse──► model refusal (logged, not cached)
//!     │
//! score confidence ──< threshold──► refusal (logged, not cached)
//!     │
//! success / degraded insight (logged, cached under its TTL)
//! ```
//!
//! Every terminal path appends exactly one decision to the sink.

use std::sync::Arc;

use verity_types::{
    ConfidenceDetails, ConfidenceFactors, ContractResult, DataSnapshot, DataSource, Decision,
    EngineResult, EngineStatus, ForecastResult, Insight, InsightMetadata, InsightStatus,
    InsightType, InsightValue, NewDecision, ProbabilityResult, Record, Scope, TimeRange,
    TrendResult, ValidationContext, VerityConfig, VerityError, VerityResult, VersionInfo,
};

use crate::audit::DecisionSink;
use crate::cache::InsightCache;
use crate::clock::{Clock, SystemClock};
use crate::confidence::{absorb_context, ConfidenceBreakdown, ConfidencePolicy};
use crate::contract::{validate_partitioned, CorrectnessContract};

const DEFAULT_BASE_CONFIDENCE: f64 = 90.0;

/// Everything the gate needs to evaluate one insight.
#[derive(Debug, Clone)]
pub struct InsightRequest<'a> {
    pub engine: String,
    pub scope: Scope,
    pub records: &'a [Record],
    pub contract: &'a CorrectnessContract,
    pub time_range: Option<TimeRange>,
    pub data_sources: Vec<DataSource>,
    pub insight_type: InsightType,
    /// Starting confidence before data-quality penalties. A computation
    /// may override it (models report their own).
    pub base_confidence: f64,
    /// Caller-known factors; validation context is folded in on top.
    pub factors: ConfidenceFactors,
    pub model_version: Option<String>,
    /// Successful insights are cached under this key when present.
    pub cache_key: Option<String>,
}

impl<'a> InsightRequest<'a> {
    pub fn new(
        engine: impl Into<String>,
        insight_type: InsightType,
        records: &'a [Record],
        contract: &'a CorrectnessContract,
    ) -> Self {
        Self {
            engine: engine.into(),
            scope: Scope::default(),
            records,
            contract,
            time_range: None,
            data_sources: Vec::new(),
            insight_type,
            base_confidence: DEFAULT_BASE_CONFIDENCE,
            factors: ConfidenceFactors::default(),
            model_version: None,
            cache_key: None,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn source(mut self, source: DataSource) -> Self {
        self.data_sources.push(source);
        self
    }

    pub fn base_confidence(mut self, base: f64) -> Self {
        self.base_confidence = base;
        self
    }

    pub fn factors(mut self, factors: ConfidenceFactors) -> Self {
        self.factors = factors;
        self
    }

    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// A candidate value produced by an engine's computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    pub value: InsightValue,
    pub explanation: String,
    pub metadata: Option<InsightMetadata>,
    pub base_confidence: Option<f64>,
}

impl Computation {
    pub fn new(value: impl Into<InsightValue>, explanation: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            explanation: explanation.into(),
            metadata: None,
            base_confidence: None,
        }
    }

    pub fn with_base_confidence(mut self, base: f64) -> Self {
        self.base_confidence = Some(base);
        self
    }

    pub fn with_metadata(mut self, metadata: InsightMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Computation),
    /// The computation declined to produce a value; the string explains why.
    Refuse(String),
}

impl Outcome {
    pub fn from_forecast(result: ForecastResult, periods: u32) -> Self {
        match result.prediction {
            None => Self::Refuse(result.explanation),
            Some(p) => Self::Value(
                Computation::new(p, result.explanation)
                    .with_base_confidence(result.confidence)
                    .with_metadata(InsightMetadata::Forecast {
                        method: result.method,
                        periods,
                        data_quality_score: result.data_quality_score,
                        confidence_interval: result.confidence_interval,
                    }),
            ),
        }
    }

    pub fn from_trend(result: TrendResult) -> Self {
        match (result.trend, result.indicators) {
            (Some(direction), Some(indicators)) => Self::Value(
                Computation::new(direction.to_string(), result.explanation)
                    .with_base_confidence(result.confidence)
                    .with_metadata(InsightMetadata::Trend {
                        method: result.method,
                        data_quality_score: result.data_quality_score,
                        indicators,
                    }),
            ),
            _ => Self::Refuse(result.explanation),
        }
    }

    pub fn from_probability(result: ProbabilityResult) -> Self {
        match result.probability {
            None => Self::Refuse(result.explanation),
            Some(p) => Self::Value(
                Computation::new(p, result.explanation)
                    .with_base_confidence(result.confidence)
                    .with_metadata(InsightMetadata::Probability {
                        method: result.method,
                        data_quality_score: result.data_quality_score,
                        factors: result.factors,
                    }),
            ),
        }
    }
}

/// Wires validation, scoring, audit, and caching together.
pub struct InsightGate {
    config: VerityConfig,
    policy: ConfidencePolicy,
    sink: Arc<dyn DecisionSink>,
    cache: Arc<InsightCache<Insight>>,
    clock: Arc<dyn Clock>,
}

impl InsightGate {
    pub fn new(
        config: VerityConfig,
        sink: Arc<dyn DecisionSink>,
        cache: Arc<InsightCache<Insight>>,
    ) -> VerityResult<Self> {
        Self::with_clock(config, sink, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: VerityConfig,
        sink: Arc<dyn DecisionSink>,
        cache: Arc<InsightCache<Insight>>,
        clock: Arc<dyn Clock>,
    ) -> VerityResult<Self> {
        config.validate()?;
        Ok(Self {
            policy: ConfidencePolicy::from_config(&config),
            config,
            sink,
            cache,
            clock,
        })
    }

    pub fn config(&self) -> &VerityConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn DecisionSink> {
        &self.sink
    }

    pub fn cache(&self) -> &Arc<InsightCache<Insight>> {
        &self.cache
    }

    /// Run `request` through the full pipeline. Never panics on bad
    /// data; every failure becomes a refusal or error insight.
    pub fn evaluate<F>(&self, request: &InsightRequest<'_>, compute: F) -> Insight
    where
        F: FnOnce(&[&Record], &ValidationContext) -> VerityResult<Outcome>,
    {
        if let Some(key) = &request.cache_key {
            if let Some(hit) = self.cache.get(key) {
                log::debug!("gate {}: cache hit for {key}", request.engine);
                return hit;
            }
        }

        let now = self.clock.now();
        let (result, legitimate) =
            validate_partitioned(request.records, request.contract, request.time_range);

        if !result.passed {
            let reason = result
                .failure_reason
                .clone()
                .unwrap_or_else(|| format!("Contract {} failed.", request.contract.id()));
            let insight = Insight::refusal(
                request.insight_type,
                "No confidence assigned: the data contract was not satisfied.",
                reason.clone(),
                request.data_sources.clone(),
                request.time_range,
                now,
            );
            let details = self.unscored(request.base_confidence, &request.factors);
            self.record(request, &result.context, Some(result.clone()), details, refusal(&insight, &reason), reason);
            return insight;
        }

        let context = result.context.clone();
        let computation = match guarded(|| compute(&legitimate, &context)) {
            Ok(Outcome::Value(c)) => c,
            Ok(Outcome::Refuse(explanation)) => {
                let insight = Insight::refusal(
                    request.insight_type,
                    "No confidence assigned: the model declined to estimate.",
                    explanation.clone(),
                    request.data_sources.clone(),
                    request.time_range,
                    now,
                );
                let details = self.unscored(request.base_confidence, &request.factors);
                self.record(request, &context, Some(result), details, refusal(&insight, &explanation), explanation);
                return insight;
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("gate {}: computation failed: {message}", request.engine);
                let insight = Insight::error(
                    request.insight_type,
                    &message,
                    request.data_sources.clone(),
                    request.time_range,
                    now,
                );
                let reason = insight.explanation.clone();
                let details = self.unscored(request.base_confidence, &request.factors);
                self.record(request, &context, Some(result), details, refusal(&insight, &reason), reason);
                return insight;
            }
        };

        let mut factors = request.factors.clone();
        absorb_context(&mut factors, &context);
        let base = computation.base_confidence.unwrap_or(request.base_confidence);
        let breakdown = ConfidenceBreakdown::compute(base, &factors);
        let details = ConfidenceDetails {
            base_confidence: base,
            factors,
            final_confidence: breakdown.confidence,
        };

        let Some(status) = self.policy.status_for(breakdown.confidence) else {
            let reason = format!(
                "Confidence {}% is below the reporting threshold of {}%.",
                breakdown.confidence,
                self.policy.refusal_threshold()
            );
            let insight = Insight::refusal(
                request.insight_type,
                breakdown.reason(),
                reason.clone(),
                request.data_sources.clone(),
                request.time_range,
                now,
            );
            self.record(request, &context, Some(result), details, refusal(&insight, &reason), reason);
            return insight;
        };

        let insight = Insight {
            value: Some(computation.value),
            insight_type: request.insight_type,
            confidence: breakdown.confidence,
            confidence_reason: breakdown.reason(),
            explanation: computation.explanation,
            data_sources: request.data_sources.clone(),
            time_range: request.time_range,
            last_computed_at: now,
            status,
            metadata: computation.metadata,
        };
        let reason = match status {
            InsightStatus::Degraded => format!(
                "Reported as degraded at {}% confidence.",
                breakdown.confidence
            ),
            _ => format!("Reported at {}% confidence.", breakdown.confidence),
        };
        self.record(
            request,
            &context,
            Some(result),
            details,
            Decision::Insight {
                insight: insight.clone(),
            },
            reason,
        );
        if let Some(key) = &request.cache_key {
            self.cache.set(key.clone(), insight.clone(), request.insight_type);
        }
        insight
    }

    /// Refuse without running a contract, for engines that can tell up
    /// front that they have nothing to report. Logged once.
    pub fn refuse(
        &self,
        engine: &str,
        scope: Scope,
        insight_type: InsightType,
        reason: impl Into<String>,
        data_sources: Vec<DataSource>,
    ) -> Insight {
        let reason = reason.into();
        let insight = Insight::refusal(
            insight_type,
            "No confidence assigned.",
            reason.clone(),
            data_sources,
            None,
            self.clock.now(),
        );
        self.sink.append(NewDecision {
            engine: engine.to_string(),
            scope,
            decision: refusal(&insight, &reason),
            data_snapshot: DataSnapshot::default(),
            contract_result: None,
            version: self.version(None, None),
            confidence_details: self.unscored(0.0, &ConfidenceFactors::default()),
            reason,
        });
        insight
    }

    /// Start collecting the insights of one engine run.
    pub fn run(&self, engine: impl Into<String>) -> EngineRun<'_> {
        EngineRun {
            gate: self,
            engine: engine.into(),
            scope: Scope::default(),
            insights: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn unscored(&self, base: f64, factors: &ConfidenceFactors) -> ConfidenceDetails {
        ConfidenceDetails {
            base_confidence: base,
            factors: factors.clone(),
            final_confidence: 0,
        }
    }

    fn version(&self, rule: Option<&str>, model: Option<&str>) -> VersionInfo {
        VersionInfo {
            rule_version: rule.map(str::to_string),
            model_version: model.map(str::to_string),
            engine_version: self.config.engine_version.clone(),
        }
    }

    fn record(
        &self,
        request: &InsightRequest<'_>,
        context: &ValidationContext,
        contract_result: Option<ContractResult>,
        confidence_details: ConfidenceDetails,
        decision: Decision,
        reason: String,
    ) {
        self.sink.append(NewDecision {
            engine: request.engine.clone(),
            scope: request.scope.clone(),
            decision,
            data_snapshot: DataSnapshot {
                total_records: context.total_records,
                legitimate_records: context.legitimate_records,
                excluded_records: context.excluded_count,
                time_range: context.time_range,
                status_counts: context.status_counts.clone(),
            },
            contract_result,
            version: self.version(
                Some(request.contract.version()),
                request.model_version.as_deref(),
            ),
            confidence_details,
            reason,
        });
    }
}

/// Run an engine computation, turning a panic into a computation error
/// so the failure still reaches the audit trail.
fn guarded<F>(compute: F) -> VerityResult<Outcome>
where
    F: FnOnce() -> VerityResult<Outcome>,
{
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(compute)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Err(VerityError::Computation(format!("computation panicked: {detail}")))
    })
}

fn refusal(insight: &Insight, reason: &str) -> Decision {
    Decision::Refusal {
        refusal_reason: reason.to_string(),
        insight: Some(insight.clone()),
    }
}

/// Insights gathered during one engine run. A failed step becomes an
/// error insight; the other steps are still returned.
pub struct EngineRun<'g> {
    gate: &'g InsightGate,
    engine: String,
    scope: Scope,
    insights: Vec<Insight>,
    errors: Vec<String>,
}

impl EngineRun<'_> {
    /// Scope recorded on decisions this run logs directly.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Evaluate one request through the gate and keep the result.
    pub fn step<F>(&mut self, request: &InsightRequest<'_>, compute: F) -> &Insight
    where
        F: FnOnce(&[&Record], &ValidationContext) -> VerityResult<Outcome>,
    {
        let insight = self.gate.evaluate(request, compute);
        self.push(insight)
    }

    pub fn push(&mut self, insight: Insight) -> &Insight {
        if insight.status == InsightStatus::Error {
            self.errors.push(insight.explanation.clone());
        }
        self.insights.push(insight);
        &self.insights[self.insights.len() - 1]
    }

    /// Record a failure that happened outside the gate (fetching data,
    /// say). Logged once as a refusal decision.
    pub fn fail(
        &mut self,
        insight_type: InsightType,
        error: &VerityError,
        data_sources: Vec<DataSource>,
    ) -> &Insight {
        let message = error.to_string();
        log::error!("engine {}: step failed: {message}", self.engine);
        let insight = Insight::error(insight_type, &message, data_sources, None, self.gate.clock.now());
        let reason = insight.explanation.clone();
        self.gate.sink.append(NewDecision {
            engine: self.engine.clone(),
            scope: self.scope.clone(),
            decision: refusal(&insight, &reason),
            data_snapshot: DataSnapshot::default(),
            contract_result: None,
            version: self.gate.version(None, None),
            confidence_details: self.gate.unscored(0.0, &ConfidenceFactors::default()),
            reason,
        });
        self.push(insight)
    }

    pub fn len(&self) -> usize {
        self.insights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    pub fn finish(self) -> EngineResult {
        let status = if self.errors.is_empty() {
            EngineStatus::Success
        } else if self.errors.len() == self.insights.len() {
            EngineStatus::Failed
        } else {
            EngineStatus::Partial
        };
        EngineResult {
            insights: self.insights,
            engine_name: self.engine,
            computed_at: self.gate.clock.now(),
            status,
            errors: (!self.errors.is_empty()).then_some(self.errors),
        }
    }
}
