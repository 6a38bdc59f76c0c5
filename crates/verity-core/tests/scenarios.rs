// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel End-to-End Scenarios
// ─────────────────────────────────────────────────────────────────────
//! Engine-shaped runs through the gate: revenue with and without enough
//! history, an outlier-distorted series, and a churn estimate on too few
//! payments.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use verity_core::predict::series::iqr_outliers;
use verity_core::{
    estimate_churn, forecast, BusinessRule, CacheInvalidator, ChurnSignals, Computation,
    CorrectnessContract, DecisionSink, DomainEvent, EventBus, ForecastOptions,
    InMemoryDecisionLog, InsightCache, InsightGate, InsightRequest, LegitimacyRule, ManualClock,
    MinimumThreshold, Module, MutationKind, Outcome, ProbabilityOptions,
};
use verity_types::{
    DataSource, Insight, InsightStatus, InsightType, ModelMethod, Record, TimeRange, VerityConfig,
};

struct Harness {
    gate: InsightGate,
    log: Arc<InMemoryDecisionLog>,
    cache: Arc<InsightCache<Insight>>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start() + Duration::days(400)));
    let config = VerityConfig::default();
    let log = Arc::new(InMemoryDecisionLog::with_clock(config.audit_capacity, clock.clone()));
    let cache = Arc::new(InsightCache::with_clock(&config, clock.clone()));
    let gate = InsightGate::with_clock(config, log.clone(), cache.clone(), clock).unwrap();
    Harness { gate, log, cache }
}

fn revenue_contract() -> CorrectnessContract {
    CorrectnessContract::builder("revenue", "Revenue", MinimumThreshold::months(6.0))
        .version("1.2.0")
        .legitimacy(LegitimacyRule::exclude_statuses(&["void", "reversed"], "voided or reversed"))
        .business(BusinessRule::min_records(3, "income"))
        .business(BusinessRule::non_negative("amount"))
        .require_fields(&["amount", "date"])
        .build()
        .unwrap()
}

/// `n` income records spread evenly across `days`.
fn income(n: usize, days: i64) -> (Vec<Record>, TimeRange) {
    let step = days / n as i64;
    let records = (0..n)
        .map(|i| {
            let at = start() + Duration::days(step * i as i64);
            Record::new()
                .with("status", "posted")
                .with("type", "income")
                .with("amount", 1200.0 + (i % 5) as f64 * 10.0)
                .with("date", at.to_rfc3339())
        })
        .collect();
    let range = TimeRange::new(start(), start() + Duration::days(days)).unwrap();
    (records, range)
}

fn total_revenue(
    records: &[&Record],
    _ctx: &verity_types::ValidationContext,
) -> verity_types::VerityResult<Outcome> {
    let total: f64 = records.iter().filter_map(|r| r.f64_field("amount")).sum();
    Ok(Outcome::Value(Computation::new(
        total,
        format!("Total revenue across {} posted income records.", records.len()),
    )))
}

#[test]
fn scenario_a_enough_history_reports() {
    let h = harness();
    let contract = revenue_contract();
    let (records, range) = income(40, 396);
    let request = InsightRequest::new("financial", InsightType::Actual, &records, &contract)
        .time_range(range)
        .source(DataSource::new("finance", "transactions").with_fields(&["amount", "status"]));

    let insight = h.gate.evaluate(&request, total_revenue);

    assert!(
        matches!(insight.status, InsightStatus::Success | InsightStatus::Degraded),
        "unexpected status {:?}: {}",
        insight.status,
        insight.explanation
    );
    assert!(insight.value.is_some());
    assert!(insight.confidence >= 60);
    let entries = h.log.all();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].decision.is_refusal());
    assert_eq!(entries[0].data_snapshot.legitimate_records, 40);
    assert_eq!(entries[0].data_snapshot.excluded_records, 0);
    assert_eq!(entries[0].version.rule_version.as_deref(), Some("1.2.0"));
}

#[test]
fn scenario_b_one_month_refuses() {
    let h = harness();
    let contract = revenue_contract();
    let (records, range) = income(3, 30);
    let request = InsightRequest::new("financial", InsightType::Actual, &records, &contract)
        .time_range(range)
        .cache_key("financial:period=2024-01");

    let insight = h.gate.evaluate(&request, total_revenue);

    assert!(insight.value.is_none());
    assert_eq!(insight.confidence, 0);
    assert_eq!(insight.status, InsightStatus::InsufficientData);
    assert!(insight.explanation.contains('6'), "{}", insight.explanation);

    let refusals: Vec<_> = h.log.all().into_iter().filter(|e| e.decision.is_refusal()).collect();
    assert_eq!(refusals.len(), 1);
    assert_eq!(h.log.len(), 1);
    assert!(h.cache.is_empty());
}

#[test]
fn scenario_c_outlier_costs_confidence() {
    let noisy = [100.0, 105.0, 98.0, 102.0, 97.0, 250.0, 103.0, 99.0, 101.0, 104.0, 96.0, 100.0];
    let mut clean = noisy;
    clean[5] = 100.0;

    assert_eq!(iqr_outliers(&noisy), vec![5]);
    assert!(iqr_outliers(&clean).is_empty());

    let h = harness();
    let contract =
        CorrectnessContract::builder("monthly", "Monthly revenue", MinimumThreshold::record_count(6))
            .build()
            .unwrap();
    let records: Vec<Record> = (0..12).map(|i| Record::new().with("month", i)).collect();
    let options = ForecastOptions::default();

    let mut confidences = Vec::new();
    for (key, series) in [("noisy", noisy), ("clean", clean)] {
        let request = InsightRequest::new("forecast", InsightType::Predicted, &records, &contract)
            .cache_key(format!("forecast:series={key}"));
        let insight = h
            .gate
            .evaluate(&request, |_, _| Ok(Outcome::from_forecast(forecast(&series, &options), 1)));
        assert!(insight.value.is_some(), "{key}: {}", insight.explanation);
        confidences.push(insight.confidence);
    }
    assert!(
        confidences[1] >= confidences[0] + 10,
        "clean {} vs noisy {}",
        confidences[1],
        confidences[0]
    );
}

#[test]
fn scenario_d_churn_too_few_payments() {
    let signals = ChurnSignals {
        total_payments: 2,
        late_payments: 1,
        days_since_last_payment: Some(20.0),
        lease_months_remaining: Some(4.0),
        open_complaints: 0,
    };
    let result = estimate_churn(&signals, &ProbabilityOptions { min_data_points: 3 });
    assert_eq!(result.method, ModelMethod::InsufficientData);
    assert!(result.probability.is_none());
    assert!(result.explanation.contains('3'), "{}", result.explanation);

    let h = harness();
    let contract = CorrectnessContract::builder("churn", "Churn", MinimumThreshold::record_count(0))
        .build()
        .unwrap();
    let request = InsightRequest::new("tenant", InsightType::Predicted, &[], &contract);
    let insight = h
        .gate
        .evaluate(&request, |_, _| Ok(Outcome::from_probability(result.clone())));
    assert!(insight.is_refusal());
    assert_eq!(h.log.len(), 1);
}

#[test]
fn finance_event_forces_recompute() {
    let h = harness();
    let contract = revenue_contract();
    let (records, range) = income(40, 396);
    let request = InsightRequest::new("financial", InsightType::Derived, &records, &contract)
        .time_range(range)
        .cache_key("financial:period=2024");

    h.gate.evaluate(&request, total_revenue);
    assert!(h.cache.contains_key("financial:period=2024"));

    let bus = EventBus::builder()
        .subscribe(Arc::new(CacheInvalidator::new(h.cache.clone()).unwrap()))
        .build();
    let delivered = bus.publish(&DomainEvent::new(
        Module::Finance,
        MutationKind::Created,
        "transaction",
        "txn-41",
    ));
    assert_eq!(delivered, 1);
    assert!(h.cache.is_empty());

    h.gate.evaluate(&request, total_revenue);
    assert_eq!(h.log.len(), 2);
}
