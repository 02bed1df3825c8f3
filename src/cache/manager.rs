//! Tiered cache manager: one partition per category, event-driven
//! invalidation with dependency cascade, and fetch tickets that keep a
//! slow writer from clobbering a fresher value.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::partition::{CacheEntry, Category, Lookup, Partition, PartitionStats, TtlClass, TtlPolicy, WriteOutcome};
use super::snapshot;
use crate::error::{CacheError, SnapshotError};
use crate::jurisdiction::Level;

/// Issued when a fetch starts; its sequence number orders the eventual
/// write against other writes and invalidations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead<T> {
    Hit(T),
    Miss,
    /// Stored payload no longer deserializes; the entry was evicted.
    Corrupt(String),
}

impl<T> CacheRead<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            Self::Hit(v) => Some(v),
            _ => None,
        }
    }
}

/// Categories a named event invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub categories: Vec<Category>,
    pub cascade: bool,
}

/// Static event registry.
pub fn event_binding(event: &str) -> Option<EventBinding> {
    let binding = |categories: &[Category], cascade: bool| EventBinding {
        categories: categories.to_vec(),
        cascade,
    };
    match event {
        "representative_update" => Some(binding(&Category::REPS, false)),
        "district_boundary_change" => Some(binding(&[Category::Location, Category::Jurisdiction], true)),
        "committee_update" => Some(binding(&[Category::Committees], false)),
        "election_certified" => Some(binding(&Category::REPS, true)),
        other => {
            let level: Level = other.strip_prefix("level_refresh:")?.parse().ok()?;
            Some(binding(&[Category::reps(level)], false))
        }
    }
}

pub const EVENTS: &[&str] = &[
    "representative_update",
    "district_boundary_change",
    "committee_update",
    "election_certified",
    "level_refresh:<level>",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub trigger: String,
    pub categories: Vec<Category>,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub entries: usize,
    pub ttl_class: TtlClass,
    pub ttl_secs: u64,
    #[serde(flatten)]
    pub stats: PartitionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub partitions: BTreeMap<Category, PartitionSummary>,
}

impl CacheStats {
    pub fn total_entries(&self) -> usize {
        self.partitions.values().map(|p| p.entries).sum()
    }
}

pub struct TieredCacheManager {
    partitions: HashMap<Category, RwLock<Partition>>,
    seq: AtomicU64,
    policy: TtlPolicy,
}

impl Default for TieredCacheManager {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

impl TieredCacheManager {
    pub fn new(policy: TtlPolicy) -> Self {
        let partitions = Category::ALL
            .iter()
            .map(|c| (*c, RwLock::new(Partition::new(*c, policy.ttl(c.ttl_class())))))
            .collect();
        Self {
            partitions,
            seq: AtomicU64::new(1),
            policy,
        }
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket {
            seq: self.next_seq(),
            started_at: Utc::now(),
        }
    }

    // Poisoning only means another thread panicked mid-update; the map
    // itself is still a valid map.
    fn read(&self, category: Category) -> Option<RwLockReadGuard<'_, Partition>> {
        self.partitions
            .get(&category)
            .map(|p| p.read().unwrap_or_else(|e| e.into_inner()))
    }

    fn write(&self, category: Category) -> Option<RwLockWriteGuard<'_, Partition>> {
        self.partitions
            .get(&category)
            .map(|p| p.write().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn get<T: DeserializeOwned>(&self, category: Category, key: &str) -> CacheRead<T> {
        self.get_at(category, key, Utc::now())
    }

    /// Lookups run under the read lock; the write lock is taken only to
    /// evict an expired or unreadable entry.
    pub fn get_at<T: DeserializeOwned>(&self, category: Category, key: &str, now: DateTime<Utc>) -> CacheRead<T> {
        let decoded: Option<Result<T, (u64, String)>> = match self.read(category) {
            Some(part) => {
                let found = part.peek(key, now);
                match found {
                    Lookup::Live(entry) => Some(
                        serde_json::from_value::<T>(entry.payload.clone()).map_err(|e| (entry.seq, e.to_string())),
                    ),
                    Lookup::Expired => None,
                    Lookup::Absent => return CacheRead::Miss,
                }
            }
            None => return CacheRead::Miss,
        };
        match decoded {
            Some(Ok(value)) => CacheRead::Hit(value),
            Some(Err((seq, e))) => {
                warn!(category = %category, key, error = %e, "corrupt cache entry evicted");
                if let Some(mut part) = self.write(category) {
                    part.mark_corrupt(key, seq);
                }
                CacheRead::Corrupt(format!("{} entry '{}' unreadable: {}", category, key, e))
            }
            None => {
                if let Some(mut part) = self.write(category) {
                    part.evict_expired(key, now);
                }
                CacheRead::Miss
            }
        }
    }

    pub fn contains(&self, category: Category, key: &str) -> bool {
        self.read(category)
            .is_some_and(|p| p.entries().any(|e| e.key == key && !e.is_expired(p.ttl(), Utc::now())))
    }

    pub fn put<T: Serialize>(
        &self,
        category: Category,
        key: &str,
        value: &T,
        tags: &[String],
        ticket: &FetchTicket,
    ) -> WriteOutcome {
        let payload = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(category = %category, key, error = %e, "cache payload not serializable");
                return WriteOutcome::Unserializable;
            }
        };
        self.put_value(category, key, payload, tags, ticket)
    }

    pub fn put_value(
        &self,
        category: Category,
        key: &str,
        payload: serde_json::Value,
        tags: &[String],
        ticket: &FetchTicket,
    ) -> WriteOutcome {
        let entry = CacheEntry {
            category,
            key: key.to_string(),
            payload,
            ttl_class: category.ttl_class(),
            cached_at: Utc::now(),
            seq: ticket.seq,
            tags: tags.iter().cloned().collect(),
        };
        let Some(mut part) = self.write(category) else {
            return WriteOutcome::Stale;
        };
        let outcome = part.put(entry);
        if outcome == WriteOutcome::Stale {
            debug!(category = %category, key, seq = ticket.seq, "stale cache write rejected");
        }
        outcome
    }

    pub fn remove(&self, category: Category, key: &str) -> bool {
        self.write(category).is_some_and(|mut p| p.remove(key).is_some())
    }

    pub fn keys(&self, category: Category) -> Vec<String> {
        self.read(category).map(|p| p.keys()).unwrap_or_default()
    }

    /// Categories a trigger reaches, following dependents when cascading.
    fn closure(roots: &[Category], cascade: bool) -> Vec<Category> {
        let mut seen: BTreeSet<Category> = roots.iter().copied().collect();
        if cascade {
            let mut queue: VecDeque<Category> = roots.iter().copied().collect();
            while let Some(c) = queue.pop_front() {
                for dep in c.dependents() {
                    if seen.insert(*dep) {
                        queue.push_back(*dep);
                    }
                }
            }
        }
        seen.into_iter().collect()
    }

    pub fn invalidate_event(&self, event: &str) -> Result<InvalidationReport, CacheError> {
        let binding = event_binding(event).ok_or_else(|| CacheError::UnknownEvent(event.to_string()))?;
        let categories = Self::closure(&binding.categories, binding.cascade);
        let fence = self.next_seq();
        let removed = categories
            .iter()
            .filter_map(|c| self.write(*c).map(|mut p| p.invalidate_all(fence)))
            .sum();
        info!(event, removed, categories = ?categories, "cache invalidated");
        Ok(InvalidationReport {
            trigger: event.to_string(),
            categories,
            removed,
        })
    }

    /// Invalidate every entry carrying `tag` (`zip:`, `county:`, `locality:`, `rep:`).
    pub fn invalidate_tag(&self, tag: &str) -> InvalidationReport {
        let fence = self.next_seq();
        let mut categories = Vec::new();
        let mut removed = 0;
        for c in Category::ALL {
            if let Some(mut p) = self.write(c) {
                let n = p.invalidate_tag(tag, fence);
                if n > 0 {
                    categories.push(c);
                    removed += n;
                }
            }
        }
        info!(tag, removed, "cache tag invalidated");
        InvalidationReport {
            trigger: tag.to_string(),
            categories,
            removed,
        }
    }

    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        Category::ALL
            .iter()
            .filter_map(|c| self.write(*c).map(|mut p| p.sweep_expired(now)))
            .sum()
    }

    pub fn stats(&self) -> CacheStats {
        let partitions = Category::ALL
            .iter()
            .filter_map(|c| {
                let p = self.read(*c)?;
                Some((
                    *c,
                    PartitionSummary {
                        entries: p.len(),
                        ttl_class: c.ttl_class(),
                        ttl_secs: p.ttl().as_secs(),
                        stats: p.stats(),
                    },
                ))
            })
            .collect();
        CacheStats { partitions }
    }

    // ─── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, path: &Path) -> Result<usize, SnapshotError> {
        let now = Utc::now();
        let mut entries = Vec::new();
        for c in Category::ALL {
            if let Some(p) = self.read(c) {
                entries.extend(p.entries().filter(|e| !e.is_expired(p.ttl(), now)).cloned());
            }
        }
        entries.sort_by(|a, b| (a.category, &a.key).cmp(&(b.category, &b.key)));
        snapshot::save(path, &entries)
    }

    /// Restore a snapshot. Expired entries are skipped; the sequence
    /// counter moves past every restored entry.
    pub fn load_snapshot(&self, path: &Path) -> Result<usize, SnapshotError> {
        let now = Utc::now();
        let mut restored = 0;
        for entry in snapshot::load(path)? {
            let Some(mut p) = self.write(entry.category) else {
                continue;
            };
            if entry.is_expired(p.ttl(), now) {
                continue;
            }
            self.seq.fetch_max(entry.seq + 1, Ordering::SeqCst);
            if p.restore(entry) {
                restored += 1;
            }
        }
        debug!(restored, path = %path.display(), "cache snapshot loaded");
        Ok(restored)
    }
}

/// Invalidation tags for a postal-code keyed entry.
pub fn location_tags(postal: &str, county: Option<&str>, locality: Option<&str>) -> Vec<String> {
    let mut tags = vec![format!("zip:{}", postal)];
    if let Some(c) = county {
        tags.push(format!("county:{}", c.to_lowercase()));
    }
    if let Some(l) = locality {
        tags.push(format!("locality:{}", l.to_lowercase()));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_put_get_roundtrip_typed() {
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        let v = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cache.put(Category::StateReps, "95814", &v, &[], &t), WriteOutcome::Stored);
        assert_eq!(cache.get::<Vec<String>>(Category::StateReps, "95814"), CacheRead::Hit(v));
        assert_eq!(cache.get::<Vec<String>>(Category::CountyReps, "95814"), CacheRead::Miss);
    }

    #[test]
    fn test_slow_writer_loses() {
        let cache = TieredCacheManager::default();
        let slow = cache.begin_fetch();
        let fast = cache.begin_fetch();
        cache.put(Category::FederalReps, "95814", &json!("fast"), &[], &fast);
        assert_eq!(
            cache.put(Category::FederalReps, "95814", &json!("slow"), &[], &slow),
            WriteOutcome::Stale
        );
        assert_eq!(cache.get::<String>(Category::FederalReps, "95814").hit().as_deref(), Some("fast"));
    }

    #[test]
    fn test_corruption_is_a_miss() {
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        cache.put_value(Category::Location, "95814", json!({"garbage": true}), &[], &t);
        match cache.get::<Vec<u32>>(Category::Location, "95814") {
            CacheRead::Corrupt(msg) => assert!(msg.contains("location")),
            other => panic!("expected corruption, got {:?}", other),
        }
        assert_eq!(cache.get::<Vec<u32>>(Category::Location, "95814"), CacheRead::Miss);
        assert_eq!(cache.stats().partitions[&Category::Location].stats.corruptions, 1);
    }

    #[test]
    fn test_reads_share_the_lock_and_expired_entries_are_evicted() {
        let cache = std::sync::Arc::new(TieredCacheManager::default());
        let t = cache.begin_fetch();
        cache.put(Category::CountyReps, "95814", &json!(["sac-bos-1"]), &[], &t);

        // a held read guard does not block lookups
        let guard = cache.read(Category::CountyReps);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || cache.get::<Vec<String>>(Category::CountyReps, "95814").hit())
            })
            .collect();
        for r in readers {
            assert_eq!(r.join().unwrap(), Some(vec!["sac-bos-1".to_string()]));
        }
        drop(guard);
        assert_eq!(cache.stats().partitions[&Category::CountyReps].stats.hits, 4);

        let later = Utc::now() + chrono::Duration::days(2);
        assert_eq!(cache.get_at::<Vec<String>>(Category::CountyReps, "95814", later), CacheRead::Miss);
        let stats = cache.stats().partitions[&Category::CountyReps].stats;
        assert_eq!(stats.expirations, 1);
        assert_eq!(cache.keys(Category::CountyReps), Vec::<String>::new());
    }

    #[test]
    fn test_boundary_change_cascades() {
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        for c in Category::ALL {
            cache.put(c, "k", &json!(1), &[], &t);
        }
        let report = cache.invalidate_event("district_boundary_change").unwrap();
        assert_eq!(report.categories.len(), Category::ALL.len());
        assert_eq!(report.removed, Category::ALL.len());
        assert_eq!(cache.stats().total_entries(), 0);
    }

    #[test]
    fn test_representative_update_spares_location() {
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        cache.put(Category::Location, "95814", &json!(1), &[], &t);
        cache.put(Category::MunicipalReps, "95814", &json!(1), &[], &t);
        cache.put(Category::Committees, "sac-mayor", &json!(1), &[], &t);
        let report = cache.invalidate_event("representative_update").unwrap();
        assert_eq!(report.removed, 1);
        assert!(cache.contains(Category::Location, "95814"));
        assert!(cache.contains(Category::Committees, "sac-mayor"));
    }

    #[test]
    fn test_level_refresh_event_and_unknown() {
        let cache = TieredCacheManager::default();
        let binding = event_binding("level_refresh:county").unwrap();
        assert_eq!(binding.categories, vec![Category::CountyReps]);
        assert_eq!(
            cache.invalidate_event("solar_eclipse"),
            Err(CacheError::UnknownEvent("solar_eclipse".into()))
        );
    }

    #[test]
    fn test_invalidation_fences_in_flight_fetch() {
        let cache = TieredCacheManager::default();
        let in_flight = cache.begin_fetch();
        cache.invalidate_event("representative_update").unwrap();
        assert_eq!(
            cache.put(Category::StateReps, "95814", &json!(1), &[], &in_flight),
            WriteOutcome::Stale
        );
        let fresh = cache.begin_fetch();
        assert_eq!(cache.put(Category::StateReps, "95814", &json!(2), &[], &fresh), WriteOutcome::Stored);
    }

    #[test]
    fn test_tag_invalidation_spans_partitions() {
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        let tags = location_tags("95814", Some("Sacramento County"), Some("Sacramento"));
        cache.put(Category::Location, "95814", &json!(1), &tags, &t);
        cache.put(Category::CountyReps, "95814", &json!(1), &tags, &t);
        cache.put(Category::CountyReps, "92501", &json!(1), &location_tags("92501", None, None), &t);
        let report = cache.invalidate_tag("county:sacramento county");
        assert_eq!(report.removed, 2);
        assert!(cache.contains(Category::CountyReps, "92501"));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache = TieredCacheManager::default();
        let t = cache.begin_fetch();
        cache.put(Category::Location, "95814", &json!({"county": "Sacramento County"}), &[], &t);
        cache.put(Category::Committees, "ca-sen-1", &json!([]), &[], &t);
        assert_eq!(cache.save_snapshot(&path).unwrap(), 2);

        let restored = TieredCacheManager::default();
        assert_eq!(restored.load_snapshot(&path).unwrap(), 2);
        assert!(restored.contains(Category::Location, "95814"));
        // restored entries never outrank new fetches
        let next = restored.begin_fetch();
        assert!(next.seq > t.seq);
    }
}
