// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Trend Detector
// ─────────────────────────────────────────────────────────────────────
//! Compares the recent 40% of a series with the historical 60%.
//!
//! Confidence starts from the series' data-quality score, moves with
//! the size of the change, and is scaled by how consistently the
//! recent points move in the detected direction.

use serde::{Deserialize, Serialize};

use verity_types::{ModelMethod, TrendDirection, TrendIndicators, TrendResult};

use super::series::{coefficient_of_variation, data_quality_score, mean, FLAT_CV, MIN_QUALITY_SCORE};

/// Share of the series treated as history.
const HISTORICAL_SHARE: f64 = 0.6;
/// Changes within ±this percentage read as stable.
const STABLE_BAND_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendOptions {
    pub min_data_points: usize,
    /// 0–100.
    pub min_confidence: f64,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            min_data_points: 6,
            min_confidence: 60.0,
        }
    }
}

fn refuse(explanation: String, quality: f64) -> TrendResult {
    TrendResult {
        trend: None,
        confidence: 0.0,
        explanation,
        method: ModelMethod::InsufficientData,
        data_quality_score: quality,
        indicators: None,
    }
}

fn change_percentage(historical: f64, recent: f64) -> f64 {
    if historical.abs() > f64::EPSILON {
        (recent - historical) / historical.abs() * 100.0
    } else if (recent - historical).abs() <= f64::EPSILON {
        0.0
    } else {
        100.0 * (recent - historical).signum()
    }
}

/// Share of consecutive pairs in `recent` that agree with `direction`.
fn consistency(recent: &[f64], direction: TrendDirection) -> f64 {
    let pairs = recent.len().saturating_sub(1);
    if pairs == 0 {
        return 0.5;
    }
    let tolerance = mean(recent).abs() * STABLE_BAND_PCT / 100.0;
    let agreeing = recent
        .windows(2)
        .filter(|w| match direction {
            TrendDirection::Increasing => w[1] > w[0],
            TrendDirection::Decreasing => w[1] < w[0],
            TrendDirection::Stable => (w[1] - w[0]).abs() <= tolerance,
        })
        .count();
    agreeing as f64 / pairs as f64
}

pub fn detect_trend(series: &[f64], options: &TrendOptions) -> TrendResult {
    if series.iter().any(|v| !v.is_finite()) {
        return refuse("Trend refused: the series contains non-finite values.".to_string(), 0.0);
    }
    let required = options.min_data_points.max(2);
    if series.len() < required {
        return refuse(
            format!(
                "Trend refused: {} data points available, a minimum of {required} is required.",
                series.len()
            ),
            0.0,
        );
    }

    let quality = data_quality_score(series);
    let cv = coefficient_of_variation(series);
    if cv < FLAT_CV {
        return refuse(
            format!(
                "Trend refused: the series shows no meaningful variation (coefficient of \
                 variation {cv:.4}, minimum {FLAT_CV})."
            ),
            quality,
        );
    }
    if quality < MIN_QUALITY_SCORE {
        return refuse(
            format!(
                "Trend refused: data quality score {quality:.0} is below the minimum of \
                 {MIN_QUALITY_SCORE:.0}."
            ),
            quality,
        );
    }

    let split = ((series.len() as f64 * HISTORICAL_SHARE).floor() as usize).clamp(1, series.len() - 1);
    let (historical, recent) = series.split_at(split);
    let historical_average = mean(historical);
    let recent_average = mean(recent);
    let change = change_percentage(historical_average, recent_average);

    let direction = if change > STABLE_BAND_PCT {
        TrendDirection::Increasing
    } else if change < -STABLE_BAND_PCT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let agreement = consistency(recent, direction);
    let mut confidence = quality;
    if direction != TrendDirection::Stable {
        if change.abs() >= 15.0 {
            confidence += 5.0;
        } else if change.abs() < 10.0 {
            confidence -= 5.0;
        }
    }
    confidence = (confidence * (0.5 + 0.5 * agreement)).clamp(0.0, 100.0);

    let indicators = TrendIndicators {
        historical_average,
        recent_average,
        change_percentage: change,
        consistency: agreement,
    };

    if confidence < options.min_confidence {
        return TrendResult {
            trend: None,
            confidence,
            explanation: format!(
                "Trend refused: confidence {confidence:.0} is below the required {:.0} \
                 (apparent {direction} change of {change:.1}%, {:.0}% of recent steps agree).",
                options.min_confidence,
                agreement * 100.0
            ),
            method: ModelMethod::InsufficientData,
            data_quality_score: quality,
            indicators: Some(indicators),
        };
    }

    TrendResult {
        trend: Some(direction),
        confidence,
        explanation: format!(
            "Recent average {recent_average:.2} over the last {} points vs historical average \
             {historical_average:.2} over the first {split}: {change:+.1}% ({direction}); \
             {:.0}% of recent steps agree. Data quality {quality:.0}/100.",
            recent.len(),
            agreement * 100.0
        ),
        method: ModelMethod::Ml,
        data_quality_score: quality,
        indicators: Some(indicators),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: [f64; 10] = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 20.0];

    #[test]
    fn test_increasing() {
        let r = detect_trend(&UP, &TrendOptions::default());
        assert_eq!(r.trend, Some(TrendDirection::Increasing));
        assert_eq!(r.method, ModelMethod::Ml);
        let ind = r.indicators.unwrap();
        assert!((ind.historical_average - 12.5).abs() < 1e-9);
        assert!((ind.recent_average - 17.75).abs() < 1e-9);
        assert_eq!(ind.consistency, 1.0);
    }

    #[test]
    fn test_decreasing() {
        let mut down = UP;
        down.reverse();
        let r = detect_trend(&down, &TrendOptions::default());
        assert_eq!(r.trend, Some(TrendDirection::Decreasing));
    }

    #[test]
    fn test_stable() {
        let series = [100.0, 104.0, 97.0, 103.0, 98.0, 102.0, 99.0, 104.0, 96.0, 101.0, 103.0, 97.0];
        let r = detect_trend(&series, &TrendOptions::default());
        assert_eq!(r.trend, Some(TrendDirection::Stable));
    }

    #[test]
    fn test_too_few_points() {
        let r = detect_trend(&[1.0, 2.0], &TrendOptions::default());
        assert!(r.trend.is_none());
        assert!(r.explanation.contains("minimum of 6"));
    }

    #[test]
    fn test_flat_refused() {
        let r = detect_trend(&[7.0; 10], &TrendOptions::default());
        assert!(r.trend.is_none());
        assert!(r.explanation.contains("no meaningful variation"));
    }

    #[test]
    fn test_below_threshold_nulls_trend() {
        let opts = TrendOptions {
            min_confidence: 100.0,
            ..Default::default()
        };
        let r = detect_trend(&UP, &opts);
        assert!(r.trend.is_none());
        assert_eq!(r.method, ModelMethod::InsufficientData);
        assert!(r.indicators.is_some());
    }

    #[test]
    fn test_zero_history_average() {
        assert_eq!(change_percentage(0.0, 0.0), 0.0);
        assert_eq!(change_percentage(0.0, 5.0), 100.0);
    }
}
