//! One cache partition: a TTL-bounded map for a single category.
//!
//! Writes carry the sequence number of the fetch that produced them. A
//! write is refused when a fresher value is already stored, or when an
//! invalidation happened after its fetch began (the partition fence or a
//! tag fence).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::jurisdiction::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Location,
    Jurisdiction,
    FederalReps,
    StateReps,
    CountyReps,
    MunicipalReps,
    Committees,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Location,
        Category::Jurisdiction,
        Category::FederalReps,
        Category::StateReps,
        Category::CountyReps,
        Category::MunicipalReps,
        Category::Committees,
    ];

    pub const REPS: [Category; 4] = [
        Category::FederalReps,
        Category::StateReps,
        Category::CountyReps,
        Category::MunicipalReps,
    ];

    pub fn reps(level: Level) -> Self {
        match level {
            Level::Federal => Self::FederalReps,
            Level::State => Self::StateReps,
            Level::County => Self::CountyReps,
            Level::Municipal => Self::MunicipalReps,
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self {
            Self::FederalReps => Some(Level::Federal),
            Self::StateReps => Some(Level::State),
            Self::CountyReps => Some(Level::County),
            Self::MunicipalReps => Some(Level::Municipal),
            _ => None,
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Self::Location => TtlClass::Historical,
            Self::Jurisdiction | Self::Committees => TtlClass::Metadata,
            Self::FederalReps | Self::StateReps | Self::CountyReps | Self::MunicipalReps => TtlClass::Active,
        }
    }

    /// Categories whose entries embed this category's entities.
    pub fn dependents(&self) -> &'static [Category] {
        match self {
            Self::Location => &[Category::Jurisdiction],
            Self::Jurisdiction => &Self::REPS,
            Self::FederalReps | Self::StateReps | Self::CountyReps | Self::MunicipalReps => {
                &[Category::Committees]
            }
            Self::Committees => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Jurisdiction => "jurisdiction",
            Self::FederalReps => "federal_reps",
            Self::StateReps => "state_reps",
            Self::CountyReps => "county_reps",
            Self::MunicipalReps => "municipal_reps",
            Self::Committees => "committees",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named cache-lifetime policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Volatile data: current office holders.
    Active,
    /// Slowly-changing descriptive data.
    Metadata,
    /// Data that changes only with boundary redraws.
    Historical,
}

impl fmt::Display for TtlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Metadata => "metadata",
            Self::Historical => "historical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub active: Duration,
    pub metadata: Duration,
    pub historical: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            active: Duration::from_secs(3600),
            metadata: Duration::from_secs(24 * 3600),
            historical: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

impl TtlPolicy {
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Active => self.active,
            TtlClass::Metadata => self.metadata,
            TtlClass::Historical => self.historical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub category: Category,
    pub key: String,
    pub payload: Value,
    pub ttl_class: TtlClass,
    pub cached_at: DateTime<Utc>,
    /// Sequence number of the fetch that produced the payload.
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        now - self.cached_at >= ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    /// A fresher value or a later invalidation won.
    Stale,
    Unserializable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub stale_rejections: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub corruptions: u64,
}

/// What a read-only lookup found.
#[derive(Debug)]
pub enum Lookup<'a> {
    Live(&'a CacheEntry),
    Expired,
    Absent,
}

pub struct Partition {
    category: Category,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    fence: u64,
    tag_fences: HashMap<String, u64>,
    stats: PartitionStats,
    // counted under the read lock
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Partition {
    pub fn new(category: Category, ttl: Duration) -> Self {
        Self {
            category,
            ttl,
            entries: HashMap::new(),
            fence: 0,
            tag_fences: HashMap::new(),
            stats: PartitionStats::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PartitionStats {
        PartitionStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..self.stats
        }
    }

    /// Number of tags currently fencing writes.
    pub fn tag_fence_count(&self) -> usize {
        self.tag_fences.len()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Look `key` up without mutating the map. Expired entries count as
    /// misses and stay in place until [`Partition::evict_expired`].
    pub fn peek(&self, key: &str, now: DateTime<Utc>) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(e) if e.is_expired(self.ttl, now) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Expired
            }
            Some(e) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Live(e)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Absent
            }
        }
    }

    /// Remove `key` if it is still expired at `now`. A fresh write that
    /// landed since the lookup is left alone.
    pub fn evict_expired(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        if !self.entries.get(key).is_some_and(|e| e.is_expired(self.ttl, now)) {
            return false;
        }
        self.entries.remove(key);
        self.stats.expirations += 1;
        true
    }

    pub fn put(&mut self, entry: CacheEntry) -> WriteOutcome {
        let fenced = entry.seq <= self.fence
            || entry
                .tags
                .iter()
                .any(|t| self.tag_fences.get(t).is_some_and(|f| entry.seq <= *f));
        let fresher_stored = self.entries.get(&entry.key).is_some_and(|cur| cur.seq > entry.seq);
        if fenced || fresher_stored {
            self.stats.stale_rejections += 1;
            return WriteOutcome::Stale;
        }
        self.entries.insert(entry.key.clone(), entry);
        self.stats.writes += 1;
        WriteOutcome::Stored
    }

    /// Insert a restored entry, keeping whichever copy is newer.
    pub fn restore(&mut self, entry: CacheEntry) -> bool {
        if let Some(cur) = self.entries.get(&entry.key) {
            if cur.cached_at >= entry.cached_at {
                return false;
            }
        }
        self.entries.insert(entry.key.clone(), entry);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.stats.invalidations += 1;
        }
        removed
    }

    /// Evict the unreadable entry written by fetch `seq`. A newer entry
    /// under the same key is kept.
    pub fn mark_corrupt(&mut self, key: &str, seq: u64) -> bool {
        if !self.entries.get(key).is_some_and(|e| e.seq == seq) {
            return false;
        }
        self.entries.remove(key);
        self.stats.corruptions += 1;
        true
    }

    /// Drop everything and refuse writes from fetches that began before `seq`.
    /// Tag fences the partition fence now covers are pruned.
    pub fn invalidate_all(&mut self, seq: u64) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        self.fence = self.fence.max(seq);
        let fence = self.fence;
        self.tag_fences.retain(|_, f| *f > fence);
        self.stats.invalidations += n as u64;
        n
    }

    pub fn invalidate_tag(&mut self, tag: &str, seq: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.tags.contains(tag));
        let fence = self.tag_fences.entry(tag.to_string()).or_insert(0);
        *fence = (*fence).max(seq);
        let n = before - self.entries.len();
        self.stats.invalidations += n as u64;
        n
    }

    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(ttl, now));
        let n = before - self.entries.len();
        self.stats.expirations += n as u64;
        n
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }
}
