//! Per-level aggregation.
//!
//! One aggregator per government level. It queries its upstream on the
//! blocking pool under a timeout, normalizes every raw record, drops
//! records without a stable id, deduplicates by id and orders the rest
//! deterministically. Records from a level-dedicated source are tagged
//! with the aggregator's level. An upstream failure never propagates: the level
//! comes back empty and marked degraded.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::normalize::{normalize, NormalizeContext};
use super::sources::{RepresentativeSource, SourceQuery};
use super::types::{Candidate, RepresentativeRecord};
use crate::error::{SourceError, Warning, WarningKind};
use crate::jurisdiction::Level;

/// What one aggregator produced for one query.
#[derive(Debug, Clone)]
pub struct LevelFetch {
    pub level: Level,
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<Warning>,
    pub degraded: bool,
}

impl LevelFetch {
    fn degraded(level: Level, err: &SourceError) -> Self {
        Self {
            level,
            candidates: Vec::new(),
            warnings: vec![Warning::for_level(WarningKind::UpstreamUnavailable, level, err.to_string())],
            degraded: true,
        }
    }
}

pub struct LevelAggregator {
    level: Level,
    source: Arc<dyn RepresentativeSource>,
    timeout: Duration,
    state_name: &'static str,
}

impl LevelAggregator {
    pub fn new(level: Level, source: Arc<dyn RepresentativeSource>, timeout: Duration) -> Self {
        Self {
            level,
            source,
            timeout,
            state_name: crate::reference::CALIFORNIA.name,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub async fn fetch(&self, query: &SourceQuery) -> LevelFetch {
        let started = Instant::now();
        let source = Arc::clone(&self.source);
        let q = query.clone();
        let task = tokio::task::spawn_blocking(move || source.fetch(&q));

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SourceError::Unavailable {
                source_name: self.source.name().to_string(),
                message: format!("worker failed: {}", join),
            }),
            Err(_) => Err(SourceError::Timeout {
                source_name: self.source.name().to_string(),
                millis: self.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(raw) => {
                let fetch = self.assemble(raw, query);
                debug!(
                    level = %self.level,
                    source = self.source.name(),
                    records = fetch.candidates.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "level fetched"
                );
                fetch
            }
            Err(err) => {
                warn!(level = %self.level, source = self.source.name(), error = %err, "level degraded");
                LevelFetch::degraded(self.level, &err)
            }
        }
    }

    /// Normalize, deduplicate and order raw upstream records.
    pub fn assemble(&self, raw: Vec<Value>, query: &SourceQuery) -> LevelFetch {
        let default_jurisdiction = match self.level {
            Level::Federal | Level::State => Some(self.state_name),
            Level::County => query.county.as_deref(),
            Level::Municipal => query.locality.as_deref(),
        }
        .unwrap_or(self.state_name);
        let ctx = NormalizeContext {
            origin: self.level,
            source: self.source.name(),
            default_jurisdiction,
            dedicated: self.source.is_level_dedicated(self.level),
        };

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(raw.len());
        for value in &raw {
            match normalize(value, &ctx) {
                Ok(c) => {
                    if seen.insert(c.id.clone()) {
                        candidates.push(c);
                    } else {
                        debug!(level = %self.level, id = %c.id, "duplicate record dropped");
                    }
                }
                Err(err) => {
                    warn!(level = %self.level, source = self.source.name(), error = %err, "record skipped");
                    warnings.push(Warning::for_level(
                        WarningKind::DataQualityViolation,
                        self.level,
                        format!("record from {} skipped: {}", self.source.name(), err),
                    ));
                }
            }
        }
        sort_candidates(&mut candidates);

        LevelFetch {
            level: self.level,
            candidates,
            warnings,
            degraded: false,
        }
    }
}

// ─── Ordering ───────────────────────────────────────────────────

/// District ascending with undistricted seats last, then name, then id.
pub fn sort_candidates(items: &mut [Candidate]) {
    items.sort_by(|a, b| {
        (a.district.is_none(), a.district, &a.name, &a.id).cmp(&(b.district.is_none(), b.district, &b.name, &b.id))
    });
}

pub fn sort_records(items: &mut [RepresentativeRecord]) {
    items.sort_by(|a, b| {
        (a.district.is_none(), a.district, &a.name, &a.id).cmp(&(b.district.is_none(), b.district, &b.name, &b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        records: Vec<Value>,
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(records: Vec<Value>) -> Self {
            Self {
                records,
                delay: Duration::ZERO,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RepresentativeSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, _q: &SourceQuery) -> Result<Vec<Value>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail {
                return Err(SourceError::Unavailable {
                    source_name: "fixed".into(),
                    message: "connection refused".into(),
                });
            }
            Ok(self.records.clone())
        }
    }

    fn query(level: Level) -> SourceQuery {
        SourceQuery {
            level,
            postal_code: "95814".into(),
            lat: Some(38.58),
            lon: Some(-121.49),
            county: Some("Sacramento County".into()),
            locality: Some("Sacramento".into()),
        }
    }

    #[tokio::test]
    async fn test_fetch_orders_and_dedupes() {
        let src = Arc::new(Fixed::new(vec![
            json!({"id": "b", "name": "Zed Ames", "title": "Council Member", "district": 5}),
            json!({"id": "a", "name": "Ann Bell", "title": "Mayor"}),
            json!({"id": "c", "name": "Cy Dunn", "title": "Council Member", "district": 2}),
            json!({"id": "b", "name": "Zed Ames (dup)", "title": "Council Member", "district": 5}),
        ]));
        let agg = LevelAggregator::new(Level::Municipal, src, Duration::from_secs(2));
        let fetch = agg.fetch(&query(Level::Municipal)).await;
        assert!(!fetch.degraded);
        let ids: Vec<&str> = fetch.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(fetch.candidates[2].jurisdiction, "Sacramento");
    }

    #[tokio::test]
    async fn test_dedicated_source_tags_its_level() {
        let src = Arc::new(Fixed::new(vec![
            json!({"id": "us-sen-1", "name": "Alex Padilla", "title": "Senator"}),
            json!({"id": "us-h-07", "name": "Doris Matsui", "title": "Member, House of Representatives"}),
        ]));
        let agg = LevelAggregator::new(Level::Federal, src, Duration::from_secs(2));
        let fetch = agg.fetch(&query(Level::Federal)).await;
        assert_eq!(fetch.candidates.len(), 2);
        assert!(fetch.candidates.iter().all(|c| c.level_tag == Some(Level::Federal)));
    }

    #[tokio::test]
    async fn test_name_joined_registry_leaves_local_records_untagged() {
        let registry = crate::representatives::RegistrySource::from_json(
            "fixture",
            r#"{"local": [
                {"id": "riv-mayor", "name": "Patricia Lock Dawson", "title": "Mayor", "jurisdiction": "Riverside"},
                {"id": "riv-bos-2", "name": "Karen Spiegel", "title": "Supervisor, District 2", "jurisdiction": "Riverside County"}
            ]}"#,
        )
        .unwrap();
        let agg = LevelAggregator::new(Level::County, Arc::new(registry), Duration::from_secs(2));
        let mut q = query(Level::County);
        q.county = Some("Riverside County".into());
        let fetch = agg.fetch(&q).await;
        assert_eq!(fetch.candidates.len(), 2);
        assert!(fetch.candidates.iter().all(|c| c.level_tag.is_none()));
    }

    #[tokio::test]
    async fn test_missing_id_is_warned() {
        let src = Arc::new(Fixed::new(vec![json!({"name": "Ghost", "title": "Mayor"})]));
        let agg = LevelAggregator::new(Level::Municipal, src, Duration::from_secs(2));
        let fetch = agg.fetch(&query(Level::Municipal)).await;
        assert!(fetch.candidates.is_empty());
        assert_eq!(fetch.warnings[0].kind, WarningKind::DataQualityViolation);
        assert!(!fetch.degraded);
    }

    #[tokio::test]
    async fn test_failure_degrades() {
        let mut src = Fixed::new(vec![json!({"id": "x", "name": "X", "title": "Mayor"})]);
        src.fail = true;
        let agg = LevelAggregator::new(Level::County, Arc::new(src), Duration::from_secs(2));
        let fetch = agg.fetch(&query(Level::County)).await;
        assert!(fetch.degraded);
        assert!(fetch.candidates.is_empty());
        assert_eq!(fetch.warnings[0].kind, WarningKind::UpstreamUnavailable);
        assert_eq!(fetch.warnings[0].level, Some(Level::County));
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let mut src = Fixed::new(vec![]);
        src.delay = Duration::from_millis(300);
        let agg = LevelAggregator::new(Level::Municipal, Arc::new(src), Duration::from_millis(20));
        let fetch = agg.fetch(&query(Level::Municipal)).await;
        assert!(fetch.degraded);
        assert!(fetch.warnings[0].message.contains("timed out"));
    }
}
