// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Correctness Contract Validator
// ─────────────────────────────────────────────────────────────────────
//! A correctness contract is the policy a dataset must satisfy before
//! any number may be derived from it.
//!
//! [`validate`] applies it in a fixed order, first failure wins:
//! 1. legitimacy rules, in declared order, each removing records,
//! 2. the minimum threshold against the surviving records,
//! 3. business rules, in order,
//! 4. refusal conditions, in order.
//!
//! The order is part of the contract's meaning; do not reorder it.
//! Failures are reported only through the returned [`ContractResult`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use verity_types::record::STATUS_FIELD;
use verity_types::{
    ContractResult, Record, TimeRange, ValidationContext, VerityError, VerityResult,
};

use crate::predict::series::outlier_percentage;

pub type RecordPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;
pub type BusinessCheck = Arc<dyn Fn(&[&Record], &ValidationContext) -> bool + Send + Sync>;
pub type RefusalCheck = Arc<dyn Fn(&[&Record], &mut ValidationContext) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Compares the legitimate record count.
    RecordCount,
    /// Compares elapsed months of the caller-supplied time range.
    ///
    /// A contract with this threshold can never pass when the caller
    /// supplies no time range. Engines using it must always pass one.
    TimeRange,
    /// Compares `legitimate / total × 100`.
    CoveragePercentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumThreshold {
    pub kind: ThresholdKind,
    pub value: f64,
    pub unit: String,
}

impl MinimumThreshold {
    pub fn record_count(count: usize) -> Self {
        Self {
            kind: ThresholdKind::RecordCount,
            value: count as f64,
            unit: "records".to_string(),
        }
    }

    pub fn months(months: f64) -> Self {
        Self {
            kind: ThresholdKind::TimeRange,
            value: months,
            unit: "months".to_string(),
        }
    }

    pub fn coverage(percentage: f64) -> Self {
        Self {
            kind: ThresholdKind::CoveragePercentage,
            value: percentage,
            unit: "%".to_string(),
        }
    }
}

/// Which records a legitimacy rule removes.
#[derive(Clone)]
pub enum Exclusion {
    /// Records whose `field` holds one of `values`.
    Statuses { field: String, values: Vec<String> },
    /// Records matching every field = value pair.
    FieldEquals(BTreeMap<String, Value>),
    /// Records for which the predicate holds.
    Predicate(RecordPredicate),
}

impl Exclusion {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Statuses { field, values } => record
                .str_field(field)
                .is_some_and(|s| values.iter().any(|v| v == s)),
            Self::FieldEquals(conditions) => {
                !conditions.is_empty()
                    && conditions
                        .iter()
                        .all(|(field, expected)| record.get(field) == Some(expected))
            }
            Self::Predicate(predicate) => predicate(record),
        }
    }
}

impl fmt::Debug for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statuses { field, values } => f
                .debug_struct("Statuses")
                .field("field", field)
                .field("values", values)
                .finish(),
            Self::FieldEquals(map) => f.debug_tuple("FieldEquals").field(map).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Removes records unsuitable for analysis (drafts, reversals,
/// soft-deletes) before any threshold or rule runs.
#[derive(Debug, Clone)]
pub struct LegitimacyRule {
    pub exclusion: Exclusion,
    pub reason: String,
}

impl LegitimacyRule {
    /// Exclude records whose `status` is any of `statuses`.
    pub fn exclude_statuses(statuses: &[&str], reason: impl Into<String>) -> Self {
        Self::exclude_field_values(STATUS_FIELD, statuses, reason)
    }

    pub fn exclude_field_values(field: &str, values: &[&str], reason: impl Into<String>) -> Self {
        Self {
            exclusion: Exclusion::Statuses {
                field: field.to_string(),
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            reason: reason.into(),
        }
    }

    /// Exclude records matching every `(field, value)` pair.
    pub fn exclude_when(conditions: &[(&str, Value)], reason: impl Into<String>) -> Self {
        Self {
            exclusion: Exclusion::FieldEquals(
                conditions
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ),
            reason: reason.into(),
        }
    }

    pub fn exclude_if(
        predicate: impl Fn(&Record) -> bool + Send + Sync + 'static,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            exclusion: Exclusion::Predicate(Arc::new(predicate)),
            reason: reason.into(),
        }
    }
}

/// A domain invariant the surviving records must satisfy.
#[derive(Clone)]
pub struct BusinessRule {
    pub name: String,
    pub validator: BusinessCheck,
    pub error_message: String,
}

impl BusinessRule {
    pub fn new(
        name: impl Into<String>,
        error_message: impl Into<String>,
        validator: impl Fn(&[&Record], &ValidationContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            validator: Arc::new(validator),
            error_message: error_message.into(),
        }
    }

    /// At least `count` legitimate records.
    pub fn min_records(count: usize, what: &str) -> Self {
        Self::new(
            format!("min_{what}_records"),
            format!("At least {count} {what} records are required to compute this figure."),
            move |records, _| records.len() >= count,
        )
    }

    /// Every record that carries `field` has a non-negative number there.
    pub fn non_negative(field: &str) -> Self {
        let f = field.to_string();
        Self::new(
            format!("{field}_non_negative"),
            format!("Records contain negative values in '{field}', which this figure cannot include."),
            move |records, _| records.iter().all(|r| r.f64_field(&f).map_or(true, |v| v >= 0.0)),
        )
    }

    /// Every record has a value in `field`.
    pub fn field_present(field: &str) -> Self {
        let f = field.to_string();
        Self::new(
            format!("{field}_present"),
            format!("Some records have no value in '{field}'."),
            move |records, _| records.iter().all(|r| r.has_value(&f)),
        )
    }
}

impl fmt::Debug for BusinessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusinessRule")
            .field("name", &self.name)
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}

/// A condition under which the kernel refuses to report at all. May
/// write findings (e.g. anomaly percentage) back into the context.
#[derive(Clone)]
pub struct RefusalCondition {
    pub name: String,
    pub check: RefusalCheck,
    pub reason: String,
}

impl RefusalCondition {
    pub fn new(
        name: impl Into<String>,
        reason: impl Into<String>,
        check: impl Fn(&[&Record], &mut ValidationContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
            reason: reason.into(),
        }
    }

    /// Refuse when more than `max_pct` of `field` values are IQR
    /// outliers. Always records the measured share in the context.
    pub fn anomaly_percentage_above(field: &str, max_pct: f64) -> Self {
        let f = field.to_string();
        Self::new(
            format!("{field}_anomalies"),
            format!(
                "More than {max_pct}% of '{field}' values are statistical outliers; the figure \
                 would be dominated by anomalies."
            ),
            move |records, ctx| {
                let values: Vec<f64> = records.iter().filter_map(|r| r.f64_field(&f)).collect();
                let pct = outlier_percentage(&values);
                ctx.anomaly_percentage = Some(pct);
                pct > max_pct
            },
        )
    }

    /// Refuse when consecutive `date_field` values are more than
    /// `max_days` apart.
    pub fn time_gap_exceeds(date_field: &str, max_days: i64) -> Self {
        let f = date_field.to_string();
        Self::new(
            format!("{date_field}_gap"),
            format!(
                "Records in '{date_field}' have a gap of more than {max_days} days; the period \
                 is not continuously covered."
            ),
            move |records, _| {
                let mut dates: Vec<_> = records.iter().filter_map(|r| r.date_field(&f)).collect();
                dates.sort();
                dates
                    .windows(2)
                    .any(|w| (w[1] - w[0]).num_days() > max_days)
            },
        )
    }
}

impl fmt::Debug for RefusalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefusalCondition")
            .field("name", &self.name)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Named, versioned data policy. Immutable once built.
#[derive(Debug, Clone)]
pub struct CorrectnessContract {
    id: String,
    name: String,
    version: String,
    minimum_threshold: MinimumThreshold,
    legitimacy_rules: Vec<LegitimacyRule>,
    business_rules: Vec<BusinessRule>,
    refusal_conditions: Vec<RefusalCondition>,
    required_fields: Vec<String>,
    status_field: String,
}

impl CorrectnessContract {
    pub fn builder(
        id: impl Into<String>,
        name: impl Into<String>,
        minimum_threshold: MinimumThreshold,
    ) -> ContractBuilder {
        ContractBuilder {
            contract: Self {
                id: id.into(),
                name: name.into(),
                version: "1".to_string(),
                minimum_threshold,
                legitimacy_rules: Vec::new(),
                business_rules: Vec::new(),
                refusal_conditions: Vec::new(),
                required_fields: Vec::new(),
                status_field: STATUS_FIELD.to_string(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn minimum_threshold(&self) -> &MinimumThreshold {
        &self.minimum_threshold
    }

    pub fn legitimacy_rules(&self) -> &[LegitimacyRule] {
        &self.legitimacy_rules
    }

    pub fn business_rules(&self) -> &[BusinessRule] {
        &self.business_rules
    }

    pub fn refusal_conditions(&self) -> &[RefusalCondition] {
        &self.refusal_conditions
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }
}

pub struct ContractBuilder {
    contract: CorrectnessContract,
}

impl ContractBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.contract.version = version.into();
        self
    }

    pub fn legitimacy(mut self, rule: LegitimacyRule) -> Self {
        self.contract.legitimacy_rules.push(rule);
        self
    }

    pub fn business(mut self, rule: BusinessRule) -> Self {
        self.contract.business_rules.push(rule);
        self
    }

    pub fn refusal(mut self, condition: RefusalCondition) -> Self {
        self.contract.refusal_conditions.push(condition);
        self
    }

    /// Fields whose absence counts toward `missing_data_percentage`.
    pub fn require_fields(mut self, fields: &[&str]) -> Self {
        self.contract
            .required_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Field tallied into `status_counts` (default `"status"`).
    pub fn status_field(mut self, field: impl Into<String>) -> Self {
        self.contract.status_field = field.into();
        self
    }

    pub fn build(self) -> VerityResult<CorrectnessContract> {
        let c = &self.contract;
        if c.id.trim().is_empty() {
            return Err(VerityError::Contract("contract id must not be empty".to_string()));
        }
        let value = c.minimum_threshold.value;
        if !value.is_finite() || value < 0.0 {
            return Err(VerityError::Contract(format!(
                "contract '{}': threshold must be a non-negative number, got {value}",
                c.id
            )));
        }
        if c.minimum_threshold.kind == ThresholdKind::CoveragePercentage && value > 100.0 {
            return Err(VerityError::Contract(format!(
                "contract '{}': coverage threshold must be <= 100, got {value}",
                c.id
            )));
        }
        Ok(self.contract)
    }
}

fn fmt_figure(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

/// Check `records` against `contract`.
///
/// `time_range` is required for contracts with a
/// [`ThresholdKind::TimeRange`] threshold; without it they always fail.
pub fn validate(
    records: &[Record],
    contract: &CorrectnessContract,
    time_range: Option<TimeRange>,
) -> ContractResult {
    validate_partitioned(records, contract, time_range).0
}

/// [`validate`], also returning the records that survived the
/// legitimacy filters so a caller can compute over exactly the set
/// that was checked.
pub fn validate_partitioned<'a>(
    records: &'a [Record],
    contract: &CorrectnessContract,
    time_range: Option<TimeRange>,
) -> (ContractResult, Vec<&'a Record>) {
    let mut ctx = ValidationContext {
        total_records: records.len(),
        time_range,
        ..Default::default()
    };

    let mut counts = BTreeMap::new();
    for status in records.iter().filter_map(|r| r.str_field(&contract.status_field)) {
        *counts.entry(status.to_string()).or_insert(0usize) += 1;
    }
    if !counts.is_empty() {
        ctx.status_counts = Some(counts);
    }

    // 1. Legitimacy filters.
    let mut candidates: Vec<&Record> = records.iter().collect();
    for rule in &contract.legitimacy_rules {
        let before = candidates.len();
        candidates.retain(|r| !rule.exclusion.matches(r));
        let removed = before - candidates.len();
        if removed > 0 {
            log::debug!(
                "contract {}: excluded {removed} records ({})",
                contract.id,
                rule.reason
            );
        }
        ctx.excluded_count += removed;
    }
    ctx.legitimate_records = candidates.len();

    if !contract.required_fields.is_empty() && !candidates.is_empty() {
        let incomplete = candidates
            .iter()
            .filter(|r| contract.required_fields.iter().any(|f| !r.has_value(f)))
            .count();
        ctx.missing_data_percentage = incomplete as f64 / candidates.len() as f64 * 100.0;
    }

    // 2–3. Minimum threshold.
    let threshold = &contract.minimum_threshold;
    let required = fmt_figure(threshold.value);
    let shortfall = match threshold.kind {
        ThresholdKind::RecordCount => {
            let found = ctx.legitimate_records;
            ((found as f64) < threshold.value).then(|| {
                format!(
                    "Insufficient data for {}: requires at least {required} {}, found {found} \
                     ({} of {} records excluded).",
                    contract.name, threshold.unit, ctx.excluded_count, ctx.total_records
                )
            })
        }
        ThresholdKind::TimeRange => match time_range {
            None => Some(format!(
                "Insufficient data for {}: requires at least {required} {} of history, but no \
                 time range was supplied.",
                contract.name, threshold.unit
            )),
            Some(range) => {
                let months = range.months();
                (months < threshold.value).then(|| {
                    format!(
                        "Insufficient data for {}: requires at least {required} {} of history, \
                         found {months:.1} {}.",
                        contract.name, threshold.unit, threshold.unit
                    )
                })
            }
        },
        ThresholdKind::CoveragePercentage => {
            let coverage = if ctx.total_records == 0 {
                0.0
            } else {
                ctx.legitimate_records as f64 / ctx.total_records as f64 * 100.0
            };
            (coverage < threshold.value).then(|| {
                format!(
                    "Insufficient data for {}: requires at least {required}% usable records, \
                     found {coverage:.1}% ({} of {}).",
                    contract.name, ctx.legitimate_records, ctx.total_records
                )
            })
        }
    };
    if let Some(reason) = shortfall {
        return (ContractResult::fail(reason, ctx), candidates);
    }

    // 4. Business rules.
    for rule in &contract.business_rules {
        if !(rule.validator)(&candidates, &ctx) {
            return (ContractResult::fail(rule.error_message.clone(), ctx), candidates);
        }
    }

    // 5. Refusal conditions.
    for condition in &contract.refusal_conditions {
        if (condition.check)(&candidates, &mut ctx) {
            return (ContractResult::fail(condition.reason.clone(), ctx), candidates);
        }
    }

    (ContractResult::pass(ctx), candidates)
}
