// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Churn and Delay Probability Estimators
// ─────────────────────────────────────────────────────────────────────
//! Fixed-weight factor tables for tenant churn and project delay.
//!
//! Each estimator runs all of its refusal checks before touching the
//! factor table. Every refusal names the requirement that was not met
//! and the figure that missed it.

use serde::{Deserialize, Serialize};

use verity_types::{ModelMethod, ProbabilityFactor, ProbabilityResult};

use super::series::MIN_QUALITY_SCORE;

/// Schedule share that must elapse before a delay estimate is attempted.
pub const MIN_SCHEDULE_ELAPSED_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityOptions {
    /// Minimum payments (churn) or tasks (delay) on record.
    pub min_data_points: usize,
}

impl ProbabilityOptions {
    pub fn churn() -> Self {
        Self { min_data_points: 3 }
    }

    pub fn delay() -> Self {
        Self { min_data_points: 5 }
    }
}

impl Default for ProbabilityOptions {
    fn default() -> Self {
        Self::churn()
    }
}

/// Payment and lease history of one tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnSignals {
    pub total_payments: usize,
    pub late_payments: usize,
    pub days_since_last_payment: Option<f64>,
    pub lease_months_remaining: Option<f64>,
    pub open_complaints: usize,
}

/// Progress snapshot of one construction project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSignals {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
    /// 0–100.
    pub schedule_elapsed_pct: f64,
    /// 0–100.
    pub progress_pct: f64,
    /// 0–100.
    pub budget_spent_pct: Option<f64>,
    pub change_orders: usize,
}

fn refuse(explanation: String, quality: f64) -> ProbabilityResult {
    ProbabilityResult {
        probability: None,
        confidence: 0.0,
        explanation,
        method: ModelMethod::InsufficientData,
        data_quality_score: quality,
        factors: Vec::new(),
    }
}

fn factor(name: &str, impact: f64, weight: f64, description: String) -> ProbabilityFactor {
    ProbabilityFactor {
        name: name.to_string(),
        impact: impact.clamp(0.0, 1.0),
        weight,
        description,
    }
}

fn combine(
    subject: &str,
    factors: Vec<ProbabilityFactor>,
    quality: f64,
    sample_share: f64,
    sample_note: String,
) -> ProbabilityResult {
    let probability = factors.iter().map(ProbabilityFactor::contribution).sum::<f64>().clamp(0.0, 1.0);
    let confidence = (quality * 0.7 + sample_share.clamp(0.0, 1.0) * 30.0).clamp(0.0, 100.0);
    let driver = factors
        .iter()
        .max_by(|a, b| a.contribution().total_cmp(&b.contribution()))
        .map(|f| format!("{} ({})", f.name, f.description))
        .unwrap_or_default();
    ProbabilityResult {
        probability: Some(probability),
        confidence,
        explanation: format!(
            "{subject} probability {:.0}% from {} weighted factors over {sample_note}; \
             largest driver: {driver}. Data quality {quality:.0}/100.",
            probability * 100.0,
            factors.len()
        ),
        method: ModelMethod::RuleBased,
        data_quality_score: quality,
        factors,
    }
}

fn churn_quality(s: &ChurnSignals) -> (f64, Vec<&'static str>) {
    let mut score: f64 = 100.0;
    let mut problems = Vec::new();
    if s.days_since_last_payment.is_none() {
        score -= 30.0;
        problems.push("days since last payment is unknown");
    }
    if s.lease_months_remaining.is_none() {
        score -= 30.0;
        problems.push("lease end date is unknown");
    }
    if s.late_payments > s.total_payments {
        score -= 50.0;
        problems.push("late payments exceed total payments");
    }
    if s.total_payments < 12 {
        score -= (12 - s.total_payments) as f64 * 2.0;
        problems.push("fewer than 12 payments on record");
    }
    (score.clamp(0.0, 100.0), problems)
}

/// Probability that a tenant does not renew.
pub fn estimate_churn(signals: &ChurnSignals, options: &ProbabilityOptions) -> ProbabilityResult {
    // A zero minimum would let 0/0 ratios through.
    let min = options.min_data_points.max(1);
    if signals.total_payments < min {
        return refuse(
            format!(
                "Churn estimate refused: only {} payment records available; a minimum of {min} \
                 payments is required.",
                signals.total_payments
            ),
            0.0,
        );
    }
    if signals.lease_months_remaining.is_none() && signals.total_payments < min * 2 {
        return refuse(
            format!(
                "Churn estimate refused: the lease end date is unknown and only {} payments are \
                 on record; without the lease term at least {} payments are required.",
                signals.total_payments,
                min * 2
            ),
            0.0,
        );
    }
    let (quality, problems) = churn_quality(signals);
    if quality < MIN_QUALITY_SCORE {
        return refuse(
            format!(
                "Churn estimate refused: data quality score {quality:.0} is below the minimum of \
                 {MIN_QUALITY_SCORE:.0} ({}).",
                problems.join("; ")
            ),
            quality,
        );
    }

    let lateness = signals.late_payments as f64 / signals.total_payments as f64;
    let (recency, recency_note) = match signals.days_since_last_payment {
        Some(days) if days.is_finite() => ((days / 90.0).max(0.0), format!("{days:.0} days since last payment")),
        _ => (0.5, "last payment date unknown".to_string()),
    };
    let (expiry, expiry_note) = match signals.lease_months_remaining {
        Some(m) if m <= 3.0 => (1.0, format!("lease ends in {m:.1} months")),
        Some(m) if m <= 6.0 => (0.6, format!("lease ends in {m:.1} months")),
        Some(m) if m <= 12.0 => (0.3, format!("lease ends in {m:.1} months")),
        Some(m) => (0.1, format!("lease ends in {m:.1} months")),
        None => (0.5, "lease end unknown".to_string()),
    };

    let factors = vec![
        factor(
            "payment_lateness",
            lateness,
            0.35,
            format!("{} of {} payments late", signals.late_payments, signals.total_payments),
        ),
        factor("payment_recency", recency, 0.20, recency_note),
        factor("lease_expiry", expiry, 0.25, expiry_note),
        factor(
            "open_complaints",
            signals.open_complaints as f64 / 3.0,
            0.20,
            format!("{} open complaints", signals.open_complaints),
        ),
    ];
    combine(
        "Churn",
        factors,
        quality,
        signals.total_payments as f64 / 24.0,
        format!("{} payments", signals.total_payments),
    )
}

fn delay_quality(s: &ProjectSignals) -> (f64, Vec<&'static str>) {
    let mut score: f64 = 100.0;
    let mut problems = Vec::new();
    if s.budget_spent_pct.is_none() {
        score -= 30.0;
        problems.push("budget spend is unknown");
    }
    if s.completed_tasks > s.total_tasks || s.overdue_tasks > s.total_tasks {
        score -= 50.0;
        problems.push("task counts are inconsistent");
    }
    if s.total_tasks < 20 {
        score -= (20 - s.total_tasks) as f64 * 1.5;
        problems.push("fewer than 20 tasks tracked");
    }
    (score.clamp(0.0, 100.0), problems)
}

/// Probability that a project finishes late.
pub fn estimate_delay(signals: &ProjectSignals, options: &ProbabilityOptions) -> ProbabilityResult {
    // A zero minimum would let 0/0 ratios through.
    let min = options.min_data_points.max(1);
    if !signals.schedule_elapsed_pct.is_finite() || !signals.progress_pct.is_finite() {
        return refuse(
            "Delay estimate refused: schedule elapsed and progress percentages must be finite \
             numbers."
                .to_string(),
            0.0,
        );
    }
    if signals.total_tasks < min {
        return refuse(
            format!(
                "Delay estimate refused: only {} tasks are tracked; a minimum of {min} tasks is \
                 required.",
                signals.total_tasks
            ),
            0.0,
        );
    }
    if signals.budget_spent_pct.is_none() && signals.total_tasks < min * 2 {
        return refuse(
            format!(
                "Delay estimate refused: budget spend is unknown and only {} tasks are tracked; \
                 without budget data at least {} tasks are required.",
                signals.total_tasks,
                min * 2
            ),
            0.0,
        );
    }
    if signals.schedule_elapsed_pct < MIN_SCHEDULE_ELAPSED_PCT {
        return refuse(
            format!(
                "Delay estimate refused: the project is only {:.0}% through its schedule; at \
                 least {MIN_SCHEDULE_ELAPSED_PCT:.0}% must elapse before delay risk is meaningful.",
                signals.schedule_elapsed_pct
            ),
            0.0,
        );
    }
    let (quality, problems) = delay_quality(signals);
    if quality < MIN_QUALITY_SCORE {
        return refuse(
            format!(
                "Delay estimate refused: data quality score {quality:.0} is below the minimum of \
                 {MIN_QUALITY_SCORE:.0} ({}).",
                problems.join("; ")
            ),
            quality,
        );
    }

    let lag = signals.schedule_elapsed_pct - signals.progress_pct;
    let overdue = signals.overdue_tasks as f64 / signals.total_tasks as f64;
    let (burn, burn_note) = match signals.budget_spent_pct {
        Some(spent) if spent.is_finite() => (
            (spent - signals.progress_pct) / 50.0,
            format!("{spent:.0}% of budget spent at {:.0}% progress", signals.progress_pct),
        ),
        _ => (0.5, "budget spend unknown".to_string()),
    };

    let factors = vec![
        factor(
            "schedule_variance",
            lag / 50.0,
            0.35,
            format!(
                "{:.0}% of schedule elapsed at {:.0}% progress",
                signals.schedule_elapsed_pct, signals.progress_pct
            ),
        ),
        factor(
            "overdue_tasks",
            overdue,
            0.30,
            format!("{} of {} tasks overdue", signals.overdue_tasks, signals.total_tasks),
        ),
        factor("budget_burn", burn, 0.20, burn_note),
        factor(
            "change_orders",
            signals.change_orders as f64 / 5.0,
            0.15,
            format!("{} change orders", signals.change_orders),
        ),
    ];
    combine(
        "Delay",
        factors,
        quality,
        signals.total_tasks as f64 / 40.0,
        format!("{} tasks", signals.total_tasks),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_tenant() -> ChurnSignals {
        ChurnSignals {
            total_payments: 18,
            late_payments: 1,
            days_since_last_payment: Some(12.0),
            lease_months_remaining: Some(20.0),
            open_complaints: 0,
        }
    }

    fn project() -> ProjectSignals {
        ProjectSignals {
            total_tasks: 30,
            completed_tasks: 10,
            overdue_tasks: 6,
            schedule_elapsed_pct: 60.0,
            progress_pct: 35.0,
            budget_spent_pct: Some(55.0),
            change_orders: 2,
        }
    }

    #[test]
    fn test_churn_zero_payments_refuses_with_zero_minimum() {
        let s = ChurnSignals {
            total_payments: 0,
            late_payments: 0,
            ..healthy_tenant()
        };
        let r = estimate_churn(&s, &ProbabilityOptions { min_data_points: 0 });
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("only 0 payment"), "{}", r.explanation);
    }

    #[test]
    fn test_delay_zero_tasks_refuses_with_zero_minimum() {
        let s = ProjectSignals {
            total_tasks: 0,
            completed_tasks: 0,
            overdue_tasks: 0,
            ..project()
        };
        let r = estimate_delay(&s, &ProbabilityOptions { min_data_points: 0 });
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("only 0 tasks"), "{}", r.explanation);
    }

    #[test]
    fn test_churn_names_minimum() {
        let s = ChurnSignals {
            total_payments: 2,
            ..healthy_tenant()
        };
        let r = estimate_churn(&s, &ProbabilityOptions::churn());
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("minimum of 3"));
    }

    #[test]
    fn test_churn_missing_lease_needs_more_samples() {
        let s = ChurnSignals {
            total_payments: 4,
            lease_months_remaining: None,
            ..healthy_tenant()
        };
        let r = estimate_churn(&s, &ProbabilityOptions::churn());
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("lease end date is unknown"));
        assert!(r.explanation.contains("at least 6"));
    }

    #[test]
    fn test_churn_low_quality() {
        let s = ChurnSignals {
            total_payments: 6,
            lease_months_remaining: None,
            days_since_last_payment: None,
            ..healthy_tenant()
        };
        let r = estimate_churn(&s, &ProbabilityOptions::churn());
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("data quality score 28"));
        assert!(r.explanation.contains("days since last payment"));
    }

    #[test]
    fn test_churn_healthy_is_low() {
        let r = estimate_churn(&healthy_tenant(), &ProbabilityOptions::churn());
        assert_eq!(r.method, ModelMethod::RuleBased);
        let p = r.probability.unwrap();
        assert!(p < 0.2, "p = {p}");
        let weights: f64 = r.factors.iter().map(|f| f.weight).sum();
        assert!((weights - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_churn_risky_is_high() {
        let s = ChurnSignals {
            total_payments: 12,
            late_payments: 9,
            days_since_last_payment: Some(75.0),
            lease_months_remaining: Some(2.0),
            open_complaints: 4,
        };
        let r = estimate_churn(&s, &ProbabilityOptions::churn());
        assert!(r.probability.unwrap() > 0.7);
        assert!(r.explanation.contains("payment_lateness") || r.explanation.contains("lease_expiry"));
    }

    #[test]
    fn test_delay_too_early() {
        let s = ProjectSignals {
            schedule_elapsed_pct: 4.0,
            ..project()
        };
        let r = estimate_delay(&s, &ProbabilityOptions::delay());
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("only 4%"));
        assert!(r.explanation.contains("at least 10%"));
    }

    #[test]
    fn test_delay_too_few_tasks() {
        let s = ProjectSignals {
            total_tasks: 3,
            completed_tasks: 1,
            overdue_tasks: 0,
            ..project()
        };
        let r = estimate_delay(&s, &ProbabilityOptions::delay());
        assert!(r.explanation.contains("minimum of 5"));
    }

    #[test]
    fn test_delay_missing_budget() {
        let s = ProjectSignals {
            total_tasks: 8,
            completed_tasks: 2,
            overdue_tasks: 1,
            budget_spent_pct: None,
            ..project()
        };
        let r = estimate_delay(&s, &ProbabilityOptions::delay());
        assert!(r.explanation.contains("budget spend is unknown"));
    }

    #[test]
    fn test_delay_behind_schedule() {
        let r = estimate_delay(&project(), &ProbabilityOptions::delay());
        assert_eq!(r.method, ModelMethod::RuleBased);
        let p = r.probability.unwrap();
        // 0.35*0.5 + 0.30*0.2 + 0.20*0.4 + 0.15*0.4 = 0.375
        assert!((p - 0.375).abs() < 1e-9, "p = {p}");
        assert!(r.confidence > 60.0);
    }

    #[test]
    fn test_delay_inconsistent_counts_refused() {
        let s = ProjectSignals {
            total_tasks: 6,
            completed_tasks: 9,
            ..project()
        };
        let r = estimate_delay(&s, &ProbabilityOptions::delay());
        assert!(r.probability.is_none());
        assert!(r.explanation.contains("inconsistent"));
    }
}
