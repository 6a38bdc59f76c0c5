// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Verity Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{VerityError, VerityResult};
use crate::insight::InsightType;

/// Hard ceiling on any reported confidence. Scores above this are
/// capped: a near-perfect score on business data is not believable.
pub const MAX_CONFIDENCE: u8 = 95;

/// Runtime configuration for the Verity Kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerityConfig {
    /// Confidence strictly below this is never reported; the candidate
    /// insight is replaced by a refusal.
    /// Default: 60.
    pub refusal_threshold: u8,

    /// Confidence at or above this reports as `success`; between the
    /// refusal threshold and this, as `degraded`.
    /// Default: 70.
    pub success_threshold: u8,

    /// Cache TTL for `actual` insights (seconds).
    /// Default: 300 (5 minutes).
    pub ttl_actual_secs: u64,

    /// Cache TTL for `derived` insights (seconds).
    /// Default: 900 (15 minutes).
    pub ttl_derived_secs: u64,

    /// Cache TTL for `predicted` insights (seconds).
    /// Default: 1800 (30 minutes).
    pub ttl_predicted_secs: u64,

    /// Maximum decision log entries held in memory before the oldest
    /// are evicted.
    /// Default: 10 000.
    pub audit_capacity: usize,

    /// Version string stamped into every decision log entry.
    pub engine_version: String,
}

impl Default for VerityConfig {
    fn default() -> Self {
        Self {
            refusal_threshold: 60,
            success_threshold: 70,
            ttl_actual_secs: 300,
            ttl_derived_secs: 900,
            ttl_predicted_secs: 1800,
            audit_capacity: 10_000,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl VerityConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> VerityResult<()> {
        if self.refusal_threshold > MAX_CONFIDENCE {
            return Err(VerityError::Config(format!(
                "refusal_threshold must be <= {MAX_CONFIDENCE}, got {}",
                self.refusal_threshold
            )));
        }
        if self.success_threshold < self.refusal_threshold
            || self.success_threshold > MAX_CONFIDENCE
        {
            return Err(VerityError::Config(format!(
                "success_threshold must be in [{}, {MAX_CONFIDENCE}], got {}",
                self.refusal_threshold, self.success_threshold
            )));
        }
        for (name, ttl) in [
            ("ttl_actual_secs", self.ttl_actual_secs),
            ("ttl_derived_secs", self.ttl_derived_secs),
            ("ttl_predicted_secs", self.ttl_predicted_secs),
        ] {
            if ttl == 0 {
                return Err(VerityError::Config(format!("{name} must be > 0")));
            }
        }
        if self.audit_capacity == 0 {
            return Err(VerityError::Config(
                "audit_capacity must be > 0".to_string(),
            ));
        }
        if self.engine_version.trim().is_empty() {
            return Err(VerityError::Config(
                "engine_version must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> VerityResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VerityError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Cache TTL in seconds for an insight's volatility class.
    pub fn ttl_secs(&self, insight_type: InsightType) -> u64 {
        match insight_type {
            InsightType::Actual => self.ttl_actual_secs,
            InsightType::Derived => self.ttl_derived_secs,
            InsightType::Predicted => self.ttl_predicted_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(VerityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_ttls() {
        let config = VerityConfig::default();
        assert_eq!(config.ttl_secs(InsightType::Actual), 300);
        assert_eq!(config.ttl_secs(InsightType::Derived), 900);
        assert_eq!(config.ttl_secs(InsightType::Predicted), 1800);
    }

    #[test]
    fn test_from_json_partial() {
        let config = VerityConfig::from_json(r#"{"audit_capacity": 50}"#).unwrap();
        assert_eq!(config.audit_capacity, 50);
        assert_eq!(config.refusal_threshold, 60);
    }

    #[test]
    fn test_from_json_garbage() {
        let err = VerityConfig::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = VerityConfig {
            refusal_threshold: 80,
            success_threshold: 70,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = VerityConfig {
            ttl_derived_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ttl_derived_secs"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = VerityConfig {
            audit_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
