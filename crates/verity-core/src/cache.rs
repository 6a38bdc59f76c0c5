// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Insight Cache
// ─────────────────────────────────────────────────────────────────────
//! TTL cache for computed insights, keyed by an opaque string built
//! from engine name and parameters.
//!
//! TTL follows the insight's volatility class (actual 5 min, derived
//! 15 min, predicted 30 min by default). Expired entries are removed
//! lazily on the first read past `expires_at`; pattern invalidation
//! removes eagerly. The cache never recomputes: a miss is `None` and
//! the calling engine recomputes and re-populates.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};

use verity_types::{Insight, InsightType, VerityConfig, VerityError, VerityResult};

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Thread-safe TTL cache. Defaults to caching single insights.
pub struct InsightCache<T = Insight> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl_actual: Duration,
    ttl_derived: Duration,
    ttl_predicted: Duration,
    clock: Arc<dyn Clock>,
}

fn secs(s: u64) -> Duration {
    i64::try_from(s)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl<T: Clone> InsightCache<T> {
    pub fn new(config: &VerityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &VerityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_actual: secs(config.ttl_actual_secs),
            ttl_derived: secs(config.ttl_derived_secs),
            ttl_predicted: secs(config.ttl_predicted_secs),
            clock,
        }
    }

    pub fn ttl(&self, insight_type: InsightType) -> Duration {
        match insight_type {
            InsightType::Actual => self.ttl_actual,
            InsightType::Derived => self.ttl_derived,
            InsightType::Predicted => self.ttl_predicted,
        }
    }

    /// Store `value` under `key` with the TTL of its volatility class.
    /// Returns the expiry time.
    pub fn set(&self, key: impl Into<String>, value: T, insight_type: InsightType) -> DateTime<Utc> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl(insight_type))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.lock().insert(
            key.into(),
            CacheEntry {
                data: value,
                computed_at: now,
                expires_at,
            },
        );
        expires_at
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.entry(key).map(|e| e.data)
    }

    /// Full entry, evicting it if expired.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(e) if e.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(e) => Some(e.clone()),
            None => None,
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every key matching `pattern`. Returns how many were removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("cache: invalidated {removed} entries matching /{pattern}/");
        }
        removed
    }

    /// Compile `pattern` and invalidate with it.
    pub fn invalidate_matching(&self, pattern: &str) -> VerityResult<usize> {
        let re = Regex::new(pattern).map_err(|e| VerityError::Pattern(format!("{pattern}: {e}")))?;
        Ok(self.invalidate_pattern(&re))
    }

    /// Eagerly drop every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Live and not-yet-evicted entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Builds `engine:k=v;k=v` keys. Parameters are sorted so the same
/// parameter set always produces the same key.
#[derive(Debug, Clone, Default)]
pub struct CacheKey {
    engine: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Display) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}:{}", self.engine, params.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn cache() -> (InsightCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        (InsightCache::with_clock(&VerityConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_actual_expires_after_five_minutes() {
        let (cache, clock) = cache();
        cache.set("k", 7, InsightType::Actual);
        clock.advance(Duration::minutes(5));
        assert_eq!(cache.get("k"), Some(7));
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.contains_key("k"));
    }

    #[test]
    fn test_ttl_by_volatility() {
        let (cache, clock) = cache();
        cache.set("a", 1, InsightType::Actual);
        cache.set("d", 2, InsightType::Derived);
        cache.set("p", 3, InsightType::Predicted);
        clock.advance(Duration::minutes(10));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("d"), Some(2));
        clock.advance(Duration::minutes(10));
        assert_eq!(cache.get("d"), None);
        assert_eq!(cache.get("p"), Some(3));
        clock.advance(Duration::minutes(11));
        assert_eq!(cache.get("p"), None);
    }

    #[test]
    fn test_invalidate_pattern_exact() {
        let (cache, _) = cache();
        cache.set("financial:tenant=1", 1, InsightType::Derived);
        cache.set("financial:tenant=2", 2, InsightType::Derived);
        cache.set("crm:tenant=1", 3, InsightType::Derived);
        let removed = cache.invalidate_pattern(&Regex::new("^financial:").unwrap());
        assert_eq!(removed, 2);
        assert_eq!(cache.keys(), vec!["crm:tenant=1".to_string()]);
    }

    #[test]
    fn test_invalidate_matching_bad_pattern() {
        let (cache, _) = cache();
        assert!(cache.invalidate_matching("([").is_err());
    }

    #[test]
    fn test_invalidate_single_key() {
        let (cache, _) = cache();
        cache.set("k", 1, InsightType::Actual);
        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache();
        cache.set("a", 1, InsightType::Actual);
        cache.set("p", 2, InsightType::Predicted);
        clock.advance(Duration::minutes(6));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_timestamps() {
        let (cache, clock) = cache();
        let expires = cache.set("k", 1, InsightType::Derived);
        let entry = cache.entry("k").unwrap();
        assert_eq!(entry.computed_at, clock.now());
        assert_eq!(entry.expires_at, expires);
        assert_eq!(expires - entry.computed_at, Duration::minutes(15));
    }

    #[test]
    fn test_cache_key_sorted() {
        let a = CacheKey::new("financial").param("tenant", 1).param("period", "2024").build();
        let b = CacheKey::new("financial").param("period", "2024").param("tenant", 1).build();
        assert_eq!(a, b);
        assert_eq!(a, "financial:period=2024;tenant=1");
    }
}
