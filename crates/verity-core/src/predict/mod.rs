// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Self-Refusing Predictive Models
// ─────────────────────────────────────────────────────────────────────
//! Small, explainable, deterministic estimators. Each is a pure
//! function over fully materialized input and each refuses, with a
//! specific explanation, rather than emit a number it cannot support.

pub mod forecast;
pub mod probability;
pub mod series;
pub mod trend;

pub use forecast::{forecast, ForecastOptions};
pub use probability::{estimate_churn, estimate_delay, ChurnSignals, ProbabilityOptions, ProjectSignals};
pub use trend::{detect_trend, TrendOptions};
