// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Decision Audit Log
// ─────────────────────────────────────────────────────────────────────
//! Append-only record of every terminal decision (success, degraded,
//! or refusal).
//!
//! Sinks sit behind the narrow [`DecisionSink`] trait:
//! - [`InMemoryDecisionLog`]: bounded FIFO window, for tests and
//!   single-process deployments.
//! - [`JsonlDecisionLog`]: the same window backed by an append-only
//!   JSON-lines file that survives restarts.
//!
//! Ids come from a counter held under the buffer lock, so id order is
//! append order even under parallel appends. Every append is mirrored
//! as a one-line summary to the `log` stream; the mirror can never
//! fail the append.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use verity_types::{DecisionLogEntry, NewDecision, VerityConfig, VerityError, VerityResult};

use crate::clock::{Clock, SystemClock};

/// Storage for decision log entries.
pub trait DecisionSink: Send + Sync {
    /// Assign id and timestamp, store, and return the stored entry.
    fn append(&self, decision: NewDecision) -> DecisionLogEntry;

    /// Up to `limit` entries from `engine`, most recent first.
    fn by_engine(&self, engine: &str, limit: usize) -> Vec<DecisionLogEntry>;

    /// Entries with `start <= timestamp <= end`, oldest first.
    fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DecisionLogEntry>;

    /// Every retained entry, oldest first.
    fn all(&self) -> Vec<DecisionLogEntry>;

    /// Drop every retained entry. Privileged: callers must gate access.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded FIFO window shared by both sinks.
#[derive(Debug)]
struct Ledger {
    entries: VecDeque<DecisionLogEntry>,
    capacity: usize,
    next_id: u64,
}

impl Ledger {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, timestamp: DateTime<Utc>, decision: NewDecision) -> DecisionLogEntry {
        let entry = DecisionLogEntry::from_new(self.next_id, timestamp, decision);
        self.next_id += 1;
        self.retain(entry.clone());
        entry
    }

    /// Store an already-identified entry, evicting the oldest if full.
    fn retain(&mut self, entry: DecisionLogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn by_engine(&self, engine: &str, limit: usize) -> Vec<DecisionLogEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.engine == engine)
            .take(limit)
            .cloned()
            .collect()
    }

    fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DecisionLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }
}

fn mirror(entry: &DecisionLogEntry) {
    if entry.decision.is_refusal() {
        log::warn!("{}", entry.summary());
    } else {
        log::info!("{}", entry.summary());
    }
}

/// In-memory decision log with a bounded FIFO window.
pub struct InMemoryDecisionLog {
    ledger: Mutex<Ledger>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDecisionLog {
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::new(capacity)),
            clock,
        }
    }

    pub fn from_config(config: &VerityConfig) -> Self {
        Self::new(config.audit_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.ledger.lock().capacity
    }
}

impl DecisionSink for InMemoryDecisionLog {
    fn append(&self, decision: NewDecision) -> DecisionLogEntry {
        let entry = self.ledger.lock().push(self.clock.now(), decision);
        mirror(&entry);
        entry
    }

    fn by_engine(&self, engine: &str, limit: usize) -> Vec<DecisionLogEntry> {
        self.ledger.lock().by_engine(engine, limit)
    }

    fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DecisionLogEntry> {
        self.ledger.lock().by_time_range(start, end)
    }

    fn all(&self) -> Vec<DecisionLogEntry> {
        self.ledger.lock().entries.iter().cloned().collect()
    }

    fn clear(&self) {
        let mut ledger = self.ledger.lock();
        log::warn!("decision log cleared ({} entries dropped)", ledger.entries.len());
        ledger.entries.clear();
    }

    fn len(&self) -> usize {
        self.ledger.lock().entries.len()
    }
}

/// Line left in a cleared log file so ids keep rising across `clear()`
/// and reopen.
#[derive(Debug, Serialize, Deserialize)]
struct Watermark {
    next_id: u64,
}

/// Persistent decision log: JSON lines on disk plus the in-memory
/// window used for queries.
pub struct JsonlDecisionLog {
    path: PathBuf,
    ledger: Mutex<Ledger>,
    file: Mutex<File>,
    clock: Arc<dyn Clock>,
}

impl JsonlDecisionLog {
    /// Open (or create) the log at `path`, reloading the most recent
    /// `capacity` entries and resuming ids after the last one.
    pub fn open(path: impl AsRef<Path>, capacity: usize, clock: Arc<dyn Clock>) -> VerityResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut ledger = Ledger::new(capacity);

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<DecisionLogEntry>(&line) {
                    Ok(entry) => {
                        ledger.next_id = ledger.next_id.max(entry.id + 1);
                        ledger.retain(entry);
                    }
                    Err(e) => match serde_json::from_str::<Watermark>(&line) {
                        Ok(mark) => ledger.next_id = ledger.next_id.max(mark.next_id),
                        Err(_) => log::warn!(
                            "decision log {}: skipping unreadable line {}: {e}",
                            path.display(),
                            line_no + 1
                        ),
                    },
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| VerityError::Sink(format!("cannot open {}: {e}", path.display())))?;

        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
            file: Mutex::new(file),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entry: &DecisionLogEntry) {
        let mut file = self.file.lock();
        let written: VerityResult<()> = serde_json::to_string(entry)
            .map_err(|e| VerityError::Serialization(e.to_string()))
            .and_then(|json| Ok(writeln!(*file, "{json}")?));
        if let Err(e) = written {
            log::error!(
                "decision #{} not persisted to {}: {e}",
                entry.id,
                self.path.display()
            );
        }
    }
}

impl DecisionSink for JsonlDecisionLog {
    fn append(&self, decision: NewDecision) -> DecisionLogEntry {
        let mut ledger = self.ledger.lock();
        let entry = ledger.push(self.clock.now(), decision);
        // Written under the ledger lock so file order matches id order.
        self.persist(&entry);
        drop(ledger);
        mirror(&entry);
        entry
    }

    fn by_engine(&self, engine: &str, limit: usize) -> Vec<DecisionLogEntry> {
        self.ledger.lock().by_engine(engine, limit)
    }

    fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DecisionLogEntry> {
        self.ledger.lock().by_time_range(start, end)
    }

    fn all(&self) -> Vec<DecisionLogEntry> {
        self.ledger.lock().entries.iter().cloned().collect()
    }

    fn clear(&self) {
        let mut ledger = self.ledger.lock();
        log::warn!(
            "decision log {} cleared ({} entries dropped)",
            self.path.display(),
            ledger.entries.len()
        );
        ledger.entries.clear();
        let mut file = self.file.lock();
        let reset: VerityResult<()> = file.set_len(0).map_err(VerityError::from).and_then(|()| {
            let mark = serde_json::to_string(&Watermark {
                next_id: ledger.next_id,
            })
            .map_err(|e| VerityError::Serialization(e.to_string()))?;
            Ok(writeln!(*file, "{mark}")?)
        });
        if let Err(e) = reset {
            log::error!("could not reset {}: {e}", self.path.display());
        }
    }

    fn len(&self) -> usize {
        self.ledger.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use verity_types::{ConfidenceDetails, ConfidenceFactors, DataSnapshot, Decision, Scope, VersionInfo};

    fn decision(engine: &str) -> NewDecision {
        let decision = Decision::Refusal {
            refusal_reason: "too few records".to_string(),
            insight: None,
        };
        NewDecision {
            engine: engine.to_string(),
            scope: Scope::default(),
            decision,
            data_snapshot: DataSnapshot::default(),
            contract_result: None,
            version: VersionInfo {
                engine_version: "test".to_string(),
                ..Default::default()
            },
            confidence_details: ConfidenceDetails {
                base_confidence: 0.0,
                factors: ConfidenceFactors::default(),
                final_confidence: 0,
            },
            reason: "test".to_string(),
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()))
    }

    #[test]
    fn test_ids_unique_and_increasing() {
        let log = InMemoryDecisionLog::new(10);
        let a = log.append(decision("financial"));
        let b = log.append(decision("financial"));
        assert!(b.id > a.id);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = InMemoryDecisionLog::new(3);
        for _ in 0..5 {
            log.append(decision("e"));
        }
        let ids: Vec<u64> = log.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_by_engine_most_recent_first() {
        let log = InMemoryDecisionLog::new(10);
        log.append(decision("financial"));
        log.append(decision("crm"));
        let last = log.append(decision("financial"));
        let found = log.by_engine("financial", 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, last.id);
        assert_eq!(log.by_engine("financial", 10).len(), 2);
        assert!(log.by_engine("asset", 10).is_empty());
    }

    #[test]
    fn test_by_time_range_inclusive() {
        let clock = clock();
        let log = InMemoryDecisionLog::with_clock(10, clock.clone());
        let t0 = clock.now();
        log.append(decision("e"));
        clock.advance(Duration::hours(1));
        log.append(decision("e"));
        clock.advance(Duration::hours(1));
        log.append(decision("e"));
        let hits = log.by_time_range(t0, t0 + Duration::hours(1));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_clear() {
        let log = InMemoryDecisionLog::new(10);
        log.append(decision("e"));
        log.clear();
        assert!(log.is_empty());
        let next = log.append(decision("e"));
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_jsonl_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        {
            let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
            log.append(decision("financial"));
            log.append(decision("crm"));
        }
        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        assert_eq!(log.len(), 2);
        let next = log.append(decision("financial"));
        assert_eq!(next.id, 3);
        assert_eq!(log.by_engine("financial", 5).len(), 2);
    }

    #[test]
    fn test_jsonl_reload_respects_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        {
            let log = JsonlDecisionLog::open(&path, 100, clock()).unwrap();
            for _ in 0..6 {
                log.append(decision("e"));
            }
        }
        let log = JsonlDecisionLog::open(&path, 4, clock()).unwrap();
        let ids: Vec<u64> = log.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_jsonl_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        {
            let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
            log.append(decision("e"));
        }
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "{{not json").unwrap();
        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_jsonl_clear_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        log.append(decision("e"));
        log.clear();
        drop(log);
        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_jsonl_ids_keep_rising_after_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        log.append(decision("e"));
        log.append(decision("e"));
        log.clear();
        let after_clear = log.append(decision("e"));
        assert_eq!(after_clear.id, 3);
        log.clear();
        drop(log);

        let log = JsonlDecisionLog::open(&path, 10, clock()).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.append(decision("e")).id, 4);
    }

    #[test]
    fn test_parallel_appends_get_distinct_ordered_ids() {
        for capacity in [1000, 50] {
            let log = Arc::new(InMemoryDecisionLog::new(capacity));
            let threads = 8;
            let per_thread = 100;
            std::thread::scope(|s| {
                for t in 0..threads {
                    let log = Arc::clone(&log);
                    s.spawn(move || {
                        for _ in 0..per_thread {
                            log.append(decision(&format!("engine-{t}")));
                        }
                    });
                }
            });

            let total = threads * per_thread;
            let entries = log.all();
            assert_eq!(log.len(), total.min(capacity));
            assert_eq!(entries.len(), total.min(capacity));
            assert!(entries.windows(2).all(|w| w[0].id < w[1].id));
            let ids: std::collections::HashSet<u64> = entries.iter().map(|e| e.id).collect();
            assert_eq!(ids.len(), entries.len());
            assert_eq!(entries.last().map(|e| e.id), Some(total as u64));
        }
    }
}
