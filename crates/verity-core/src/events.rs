// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Domain Event Bus
// ─────────────────────────────────────────────────────────────────────
//! Typed domain-mutation events delivered to a subscriber list that is
//! fixed when the bus is built.
//!
//! The main subscriber is [`CacheInvalidator`], which maps each
//! originating module to the cache-key patterns its mutations make
//! stale. Invalidation only removes entries: the next read misses and
//! the owning engine recomputes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use verity_types::{Insight, VerityError, VerityResult};

use crate::cache::InsightCache;

/// Module a mutation originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Finance,
    Assets,
    Workforce,
    Construction,
    Crm,
    Tenant,
    Operations,
}

impl Module {
    pub const ALL: [Module; 7] = [
        Module::Finance,
        Module::Assets,
        Module::Workforce,
        Module::Construction,
        Module::Crm,
        Module::Tenant,
        Module::Operations,
    ];

    /// Cache-key prefixes whose insights depend on this module's data.
    pub fn default_prefixes(self) -> &'static [&'static str] {
        match self {
            Module::Finance => &["financial", "transaction-risk"],
            Module::Tenant => &["tenant", "churn"],
            Module::Construction => &["construction", "delay"],
            Module::Assets => &["assets"],
            Module::Workforce => &["workforce"],
            Module::Crm => &["crm"],
            Module::Operations => &["operations"],
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Module::Finance => "finance",
            Module::Assets => "assets",
            Module::Workforce => "workforce",
            Module::Construction => "construction",
            Module::Crm => "crm",
            Module::Tenant => "tenant",
            Module::Operations => "operations",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub module: Module,
    pub action: MutationKind,
    /// Entity kind, e.g. "transaction" or "lease".
    pub entity: String,
    pub entity_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(
        module: Module,
        action: MutationKind,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            module,
            action,
            entity: entity.into(),
            entity_id: entity_id.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str;
    fn on_event(&self, event: &DomainEvent);
}

/// Publishes events to a subscriber list fixed at build time.
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// A panicking subscriber is logged and skipped; the rest still
    /// receive the event. Returns the number of successful deliveries.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;
        for sub in &self.subscribers {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sub.on_event(event))) {
                Ok(()) => delivered += 1,
                Err(_) => log::error!(
                    "event bus: subscriber '{}' panicked on {} {} {}",
                    sub.name(),
                    event.module,
                    event.entity,
                    event.entity_id
                ),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[derive(Default)]
pub struct EventBusBuilder {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBusBuilder {
    pub fn subscribe(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            subscribers: self.subscribers,
        }
    }
}

fn prefix_pattern(prefix: &str) -> VerityResult<Regex> {
    compile(&format!("^{}:", regex::escape(prefix)))
}

fn compile(pattern: &str) -> VerityResult<Regex> {
    Regex::new(pattern).map_err(|e| VerityError::Pattern(format!("{pattern}: {e}")))
}

/// Removes cache entries made stale by a domain mutation.
pub struct CacheInvalidator {
    cache: Arc<InsightCache<Insight>>,
    rules: HashMap<Module, Vec<Regex>>,
    /// Applied on every event regardless of module.
    always: Vec<Regex>,
}

impl CacheInvalidator {
    /// Invalidator with the default module map plus the cross-module
    /// anomaly cache on every event.
    pub fn new(cache: Arc<InsightCache<Insight>>) -> VerityResult<Self> {
        let mut rules = HashMap::new();
        for module in Module::ALL {
            let patterns = module
                .default_prefixes()
                .iter()
                .map(|p| prefix_pattern(p))
                .collect::<VerityResult<Vec<_>>>()?;
            rules.insert(module, patterns);
        }
        Ok(Self {
            cache,
            rules,
            always: vec![prefix_pattern("anomaly")?],
        })
    }

    /// Replace the patterns for `module`.
    pub fn with_rule(mut self, module: Module, patterns: &[&str]) -> VerityResult<Self> {
        let compiled = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<VerityResult<Vec<_>>>()?;
        self.rules.insert(module, compiled);
        Ok(self)
    }

    /// Invalidate for `event`; returns entries removed.
    pub fn invalidate_for(&self, event: &DomainEvent) -> usize {
        let module_patterns = self.rules.get(&event.module).map(Vec::as_slice).unwrap_or(&[]);
        let removed: usize = module_patterns
            .iter()
            .chain(self.always.iter())
            .map(|re| self.cache.invalidate_pattern(re))
            .sum();
        log::debug!(
            "cache invalidator: {} {:?} {} removed {removed} entries",
            event.module,
            event.action,
            event.entity
        );
        removed
    }
}

impl EventSubscriber for CacheInvalidator {
    fn name(&self) -> &str {
        "cache-invalidator"
    }

    fn on_event(&self, event: &DomainEvent) {
        self.invalidate_for(event);
    }
}
