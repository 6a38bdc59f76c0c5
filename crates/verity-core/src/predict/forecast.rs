// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Time-Series Forecast (Holt Linear Smoothing)
// ─────────────────────────────────────────────────────────────────────
//! Double exponential smoothing over an ordered series with a hard
//! refusal policy.
//!
//! The forecast refuses (prediction `None`, method `InsufficientData`)
//! when:
//! 1. fewer than `min_data_points` samples exist,
//! 2. the series' data-quality score is below 50, or
//! 3. `quality − 5·periods − 20·CV` falls below `min_confidence`.

use serde::{Deserialize, Serialize};

use verity_types::{ConfidenceInterval, ForecastResult, ModelMethod};

use super::series::{coefficient_of_variation, data_quality_score, std_dev, MIN_QUALITY_SCORE};

/// Level smoothing factor.
pub const ALPHA: f64 = 0.3;
/// Trend smoothing factor.
pub const BETA: f64 = 0.2;
/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastOptions {
    /// Steps ahead to project.
    pub periods: u32,
    pub min_data_points: usize,
    /// 0–100.
    pub min_confidence: f64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            periods: 1,
            min_data_points: 6,
            min_confidence: 60.0,
        }
    }
}

fn refuse(explanation: String, confidence: f64, quality: f64) -> ForecastResult {
    ForecastResult {
        prediction: None,
        confidence,
        explanation,
        method: ModelMethod::InsufficientData,
        data_quality_score: quality,
        confidence_interval: None,
    }
}

/// Final level and trend after smoothing the whole series.
fn holt(series: &[f64]) -> (f64, f64) {
    let mut level = series[0];
    let mut trend = if series.len() > 1 { series[1] - series[0] } else { 0.0 };
    for &x in &series[1..] {
        let prev_level = level;
        level = ALPHA * x + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - prev_level) + (1.0 - BETA) * trend;
    }
    (level, trend)
}

/// Project `options.periods` steps past the end of `series`.
pub fn forecast(series: &[f64], options: &ForecastOptions) -> ForecastResult {
    if series.iter().any(|v| !v.is_finite()) {
        return refuse(
            "Forecast refused: the series contains non-finite values.".to_string(),
            0.0,
            0.0,
        );
    }
    if options.periods == 0 {
        return refuse(
            "Forecast refused: the horizon must be at least 1 period.".to_string(),
            0.0,
            0.0,
        );
    }
    if series.is_empty() || series.len() < options.min_data_points {
        return refuse(
            format!(
                "Forecast refused: {} data points available, a minimum of {} is required.",
                series.len(),
                options.min_data_points
            ),
            0.0,
            0.0,
        );
    }

    let quality = data_quality_score(series);
    if quality < MIN_QUALITY_SCORE {
        return refuse(
            format!(
                "Forecast refused: data quality score {quality:.0} is below the minimum of \
                 {MIN_QUALITY_SCORE:.0} (flat series, outliers, or too few samples)."
            ),
            0.0,
            quality,
        );
    }

    let periods = options.periods as f64;
    let cv = coefficient_of_variation(series);
    let confidence = (quality - 5.0 * periods - 20.0 * cv).clamp(0.0, 100.0);
    if confidence < options.min_confidence {
        return refuse(
            format!(
                "Forecast refused: confidence {confidence:.0} is below the required {:.0} \
                 (quality {quality:.0}, {} period horizon, coefficient of variation {cv:.2}).",
                options.min_confidence, options.periods
            ),
            confidence,
            quality,
        );
    }

    let (level, trend) = holt(series);
    let prediction = level + periods * trend;
    let margin = Z_95 * std_dev(series) * periods.sqrt();

    ForecastResult {
        prediction: Some(prediction),
        confidence,
        explanation: format!(
            "Holt exponential smoothing (alpha={ALPHA}, beta={BETA}) over {} points projects \
             {prediction:.2} at {} period(s) ahead; 95% interval ±{margin:.2}. Data quality \
             {quality:.0}/100, coefficient of variation {cv:.2}.",
            series.len(),
            options.periods
        ),
        method: ModelMethod::Ml,
        data_quality_score: quality,
        confidence_interval: Some(ConfidenceInterval {
            lower: prediction - margin,
            upper: prediction + margin,
            level: 0.95,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising() -> Vec<f64> {
        (0..12).map(|i| 100.0 + i as f64 * 2.0 + if i % 2 == 0 { 0.5 } else { -0.5 }).collect()
    }

    #[test]
    fn test_too_few_points() {
        let r = forecast(&[1.0, 2.0, 3.0], &ForecastOptions::default());
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.prediction.is_none());
        assert!(r.explanation.contains("minimum of 6"));
    }

    #[test]
    fn test_empty_series() {
        let opts = ForecastOptions {
            min_data_points: 0,
            ..Default::default()
        };
        let r = forecast(&[], &opts);
        assert!(r.prediction.is_none());
    }

    #[test]
    fn test_flat_series_refused_on_quality() {
        let r = forecast(&[10.0; 12], &ForecastOptions::default());
        assert!(r.prediction.is_none());
        assert!(r.explanation.contains("data quality"));
    }

    #[test]
    fn test_rising_series_projects_upward() {
        let series = rising();
        let r = forecast(&series, &ForecastOptions::default());
        assert_eq!(r.method, ModelMethod::Ml);
        let p = r.prediction.unwrap();
        assert!(p > *series.last().unwrap());
        let ci = r.confidence_interval.unwrap();
        assert!(ci.lower < p && p < ci.upper);
    }

    #[test]
    fn test_interval_widens_with_horizon() {
        let series = rising();
        let opts = |periods| ForecastOptions {
            periods,
            min_confidence: 0.0,
            ..Default::default()
        };
        let one = forecast(&series, &opts(1)).confidence_interval.unwrap();
        let four = forecast(&series, &opts(4)).confidence_interval.unwrap();
        assert!((four.upper - four.lower) > (one.upper - one.lower) * 1.9);
    }

    #[test]
    fn test_low_confidence_refused() {
        let series = rising();
        let opts = ForecastOptions {
            periods: 8,
            ..Default::default()
        };
        // 100 - 40 - small CV term < 60
        let r = forecast(&series, &opts);
        assert!(r.prediction.is_none());
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.confidence > 0.0 && r.confidence < 60.0);
    }

    #[test]
    fn test_zero_periods_refused() {
        let opts = ForecastOptions {
            periods: 0,
            ..Default::default()
        };
        assert!(forecast(&rising(), &opts).prediction.is_none());
    }

    #[test]
    fn test_nan_refused() {
        let mut series = rising();
        series[3] = f64::NAN;
        assert!(forecast(&series, &ForecastOptions::default()).prediction.is_none());
    }
}
