//! Resolution orchestrator.
//!
//! Flow per request:
//! parse → location (cache or geocode) → jurisdiction (cache or classify)
//! → fan out to the applicable level aggregators (cache first, bounded,
//! each under a timeout) → name-collision resolution → data-quality gate
//! → cache each level → assemble.
//!
//! Only a malformed postal code is an error. Everything else degrades into
//! warnings and flags on the result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{location_tags, CacheRead, CacheStats, Category, InvalidationReport, TieredCacheManager};
use crate::collision::NameCollisionResolver;
use crate::config::EngineConfig;
use crate::error::{CacheError, GeoError, ResolveError, SourceError, Warning, WarningKind};
use crate::geo::{GeoResolver, Geocoder, NominatimGeocoder, PostalCode, PostalLocation};
use crate::jurisdiction::{Jurisdiction, JurisdictionClassifier, JurisdictionType, Level};
use crate::preload::{BoxFuture, ForegroundGauge, Priority, PreloadQueue, PreloadTask, QueueStats, TaskHandler};
use crate::reference::{self, CALIFORNIA};
use crate::representatives::{
    sort_records, CommitteeDetail, CommitteeSource, HttpSource, LevelAggregator, LevelFetch, RegistrySource,
    RepresentativeRecord, RepresentativeSource, SourceQuery,
};
use crate::scheduler::{RefreshFn, RefreshReason};
use crate::validation::DataQualityValidator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveFlags {
    pub include_committees: bool,
    /// Bypass every cache read; fresh results are still written back.
    pub force_refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub postal_code: String,
    pub location: Option<PostalLocation>,
    pub jurisdiction: Jurisdiction,
    /// Always holds all four levels; non-applicable levels are empty.
    pub representatives: BTreeMap<Level, Vec<RepresentativeRecord>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub committees: BTreeMap<String, Vec<CommitteeDetail>>,
    pub warnings: Vec<Warning>,
    pub degraded_levels: Vec<Level>,
    pub degraded: bool,
}

impl AggregateResult {
    pub fn records(&self, level: Level) -> &[RepresentativeRecord] {
        self.representatives.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_records(&self) -> usize {
        self.representatives.values().map(Vec::len).sum()
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// What is cached per (level, postal code): the final records together
/// with the warnings produced while building them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub records: Vec<RepresentativeRecord>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub level: Level,
    pub keys: usize,
    pub refreshed: usize,
    pub degraded: usize,
}

struct LevelOutcome {
    snapshot: LevelSnapshot,
    degraded: bool,
}

// ─── Collaborators ──────────────────────────────────────────────

/// Upstream collaborators, one per concern.
pub struct Collaborators {
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub federal: Arc<dyn RepresentativeSource>,
    pub state: Arc<dyn RepresentativeSource>,
    pub county: Arc<dyn RepresentativeSource>,
    pub municipal: Arc<dyn RepresentativeSource>,
    pub committees: Arc<dyn CommitteeSource>,
}

impl Collaborators {
    /// Everything served from the bundled sample registry, no geocoder.
    pub fn bundled() -> Result<Self, SourceError> {
        let registry = Arc::new(RegistrySource::bundled()?);
        Ok(Self {
            geocoder: None,
            federal: registry.clone(),
            state: registry.clone(),
            county: registry.clone(),
            municipal: registry.clone(),
            committees: registry,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, SourceError> {
        let bundled = Arc::new(RegistrySource::bundled()?);
        let timeout = config.aggregator_timeout();
        let http = |name: &str, url: &Option<String>| -> Arc<dyn RepresentativeSource> {
            match url {
                Some(u) => Arc::new(HttpSource::new(name, u.clone(), timeout)),
                None => bundled.clone(),
            }
        };
        let registry = |path: &Option<PathBuf>| -> Result<Arc<RegistrySource>, SourceError> {
            match path {
                Some(p) => Ok(Arc::new(RegistrySource::load(p)?)),
                None => Ok(bundled.clone()),
            }
        };
        let sources = &config.sources;
        let geocoder: Option<Arc<dyn Geocoder>> = if config.offline {
            None
        } else {
            Some(Arc::new(NominatimGeocoder::new(
                sources.geocoder_url.clone(),
                CALIFORNIA.name,
                config.geocoder_timeout(),
            )))
        };
        Ok(Self {
            geocoder,
            federal: http("federal-provider", &sources.federal_url),
            state: http("state-provider", &sources.state_url),
            county: registry(&sources.county_registry)?,
            municipal: registry(&sources.municipal_registry)?,
            committees: registry(&sources.committee_registry)?,
        })
    }
}

// ─── Pipeline ───────────────────────────────────────────────────

struct Pipeline {
    geo: Arc<GeoResolver>,
    classifier: JurisdictionClassifier,
    aggregators: BTreeMap<Level, Arc<LevelAggregator>>,
    collision: NameCollisionResolver,
    validator: DataQualityValidator,
    cache: Arc<TieredCacheManager>,
    committees: Arc<dyn CommitteeSource>,
    committee_timeout: Duration,
    fanout: Arc<Semaphore>,
    gauge: Arc<ForegroundGauge>,
    preload: Arc<PreloadQueue>,
}

impl Pipeline {
    async fn resolve(&self, input: &str, flags: ResolveFlags) -> Result<AggregateResult, ResolveError> {
        let _foreground = self.gauge.enter();
        let postal = PostalCode::parse_for(input, self.geo.profile()).inspect_err(|e| {
            info!(input, error = %e, "postal code rejected");
        })?;
        let force = flags.force_refresh;

        let mut transient = Vec::new();
        let location = self.locate(&postal, force, &mut transient).await;
        let jurisdiction = self.classify(location.as_ref(), &postal, force, &mut transient);
        let levels: Vec<Level> = jurisdiction.applicable_levels.iter().collect();
        let outcomes = self
            .gather(&postal, location.as_ref(), &jurisdiction, &levels, force, &mut transient)
            .await;

        let mut warnings = Vec::new();
        if let Some(loc) = &location {
            warnings.extend(self.location_warnings(loc));
        }
        warnings.extend(self.jurisdiction_warnings(&jurisdiction));
        warnings.extend(applicability_warnings(&jurisdiction, location.as_ref()));

        let mut representatives: BTreeMap<Level, Vec<RepresentativeRecord>> =
            Level::ALL.iter().map(|l| (*l, Vec::new())).collect();
        let mut degraded_levels = Vec::new();
        for (level, outcome) in outcomes {
            warnings.extend(outcome.snapshot.warnings);
            if outcome.degraded {
                degraded_levels.push(level);
            }
            representatives.insert(level, outcome.snapshot.records);
        }

        let ids: Vec<String> = representatives.values().flatten().map(|r| r.id.clone()).collect();
        let committees = self.committees_for(&ids, flags.include_committees, &mut transient).await;
        warnings.extend(transient);

        let degraded = !degraded_levels.is_empty() || location.is_none();
        let result = AggregateResult {
            postal_code: postal.to_string(),
            location,
            jurisdiction,
            representatives,
            committees,
            warnings,
            degraded_levels,
            degraded,
        };
        info!(
            postal = %result.postal_code,
            kind = %result.jurisdiction.kind,
            records = result.total_records(),
            warnings = result.warnings.len(),
            degraded = result.degraded,
            "representation resolved"
        );
        Ok(result)
    }

    // ─── Location & jurisdiction ────────────────────────────────

    async fn locate(&self, postal: &PostalCode, force: bool, transient: &mut Vec<Warning>) -> Option<PostalLocation> {
        let key = postal.as_str();
        if !force {
            match self.cache.get::<PostalLocation>(Category::Location, key) {
                CacheRead::Hit(loc) => return Some(loc),
                CacheRead::Corrupt(msg) => transient.push(Warning::new(WarningKind::CacheCorruption, msg)),
                CacheRead::Miss => {}
            }
        }

        let ticket = self.cache.begin_fetch();
        let geo = Arc::clone(&self.geo);
        let code = postal.clone();
        let resolved = tokio::task::spawn_blocking(move || geo.resolve(&code))
            .await
            .unwrap_or_else(|e| Err(GeoError::Network(format!("geocoding worker failed: {}", e))));

        match resolved {
            Ok(loc) => {
                let report = self.validator.validate_location(&loc);
                if report.is_critical() {
                    for v in report.criticals() {
                        warn!(postal = %postal, field = %v.field, value = %v.value, rule = %v.rule,
                            "location dropped by data-quality gate");
                        transient.push(v.to_warning(None, &format!("location {}", postal)));
                    }
                    return None;
                }
                let tags = location_tags(key, Some(loc.county.as_str()), loc.locality.as_deref());
                self.cache.put(Category::Location, key, &loc, &tags, &ticket);
                Some(loc)
            }
            Err(e) => {
                warn!(postal = %postal, error = %e, "location unavailable");
                transient.push(Warning::new(
                    WarningKind::UpstreamUnavailable,
                    format!("location for {} unavailable: {}", postal, e),
                ));
                None
            }
        }
    }

    fn classify(
        &self,
        location: Option<&PostalLocation>,
        postal: &PostalCode,
        force: bool,
        transient: &mut Vec<Warning>,
    ) -> Jurisdiction {
        let Some(loc) = location else {
            return Jurisdiction::unresolved(format!(
                "location for {} could not be resolved; only federal and state levels apply",
                postal
            ));
        };
        let key = postal.as_str();
        if !force {
            match self.cache.get::<Jurisdiction>(Category::Jurisdiction, key) {
                CacheRead::Hit(j) => return j,
                CacheRead::Corrupt(msg) => transient.push(Warning::new(WarningKind::CacheCorruption, msg)),
                CacheRead::Miss => {}
            }
        }

        let ticket = self.cache.begin_fetch();
        let j = self.classifier.classify(loc);
        let report = self.validator.validate_jurisdiction(&j);
        if report.is_critical() {
            for v in report.criticals() {
                warn!(postal = %postal, field = %v.field, value = %v.value, rule = %v.rule,
                    "jurisdiction dropped by data-quality gate");
                transient.push(v.to_warning(None, &format!("jurisdiction {}", postal)));
            }
            return Jurisdiction::unresolved(format!("classification of {} failed validation", postal));
        }
        let tags = location_tags(key, Some(loc.county.as_str()), loc.locality.as_deref());
        self.cache.put(Category::Jurisdiction, key, &j, &tags, &ticket);
        j
    }

    fn location_warnings(&self, loc: &PostalLocation) -> Vec<Warning> {
        let subject = format!("location {}", loc.postal_code);
        let mut out: Vec<Warning> = loc
            .notes
            .iter()
            .map(|n| Warning::new(WarningKind::GeocodeFallback, format!("{}: {}", subject, n)))
            .collect();
        out.extend(
            self.validator
                .validate_location(loc)
                .warnings()
                .map(|v| v.to_warning(None, &subject)),
        );
        out
    }

    fn jurisdiction_warnings(&self, j: &Jurisdiction) -> Vec<Warning> {
        self.validator
            .validate_jurisdiction(j)
            .warnings()
            .map(|v| v.to_warning(None, &format!("jurisdiction ({})", j.kind)))
            .collect()
    }

    // ─── Levels ─────────────────────────────────────────────────

    async fn gather(
        &self,
        postal: &PostalCode,
        location: Option<&PostalLocation>,
        jurisdiction: &Jurisdiction,
        levels: &[Level],
        force: bool,
        transient: &mut Vec<Warning>,
    ) -> BTreeMap<Level, LevelOutcome> {
        let mut outcomes = BTreeMap::new();
        let mut to_fetch = Vec::new();
        for &level in levels {
            if !force {
                match self.cache.get::<LevelSnapshot>(Category::reps(level), postal.as_str()) {
                    CacheRead::Hit(snapshot) => {
                        outcomes.insert(level, LevelOutcome { snapshot, degraded: false });
                        continue;
                    }
                    CacheRead::Corrupt(msg) => {
                        transient.push(Warning::for_level(WarningKind::CacheCorruption, level, msg));
                    }
                    CacheRead::Miss => {}
                }
            }
            to_fetch.push(level);
        }
        if !to_fetch.is_empty() {
            outcomes.extend(self.fetch_levels(postal, location, jurisdiction, &to_fetch).await);
        }
        outcomes
    }

    /// Fetch `levels` concurrently, resolve, validate and cache them.
    async fn fetch_levels(
        &self,
        postal: &PostalCode,
        location: Option<&PostalLocation>,
        jurisdiction: &Jurisdiction,
        levels: &[Level],
    ) -> BTreeMap<Level, LevelOutcome> {
        let ticket = self.cache.begin_fetch();
        let place = jurisdiction
            .place
            .clone()
            .or_else(|| location.and_then(|l| l.locality.clone()));

        let mut handles: Vec<(Level, JoinHandle<LevelFetch>)> = Vec::new();
        for &level in levels {
            let Some(aggregator) = self.aggregators.get(&level).cloned() else {
                continue;
            };
            let query = SourceQuery {
                level,
                postal_code: postal.to_string(),
                lat: location.map(|l| l.lat),
                lon: location.map(|l| l.lon),
                county: location.map(|l| l.county.clone()),
                locality: place.clone(),
            };
            let fanout = Arc::clone(&self.fanout);
            handles.push((
                level,
                tokio::spawn(async move {
                    let _permit = fanout.acquire_owned().await.ok();
                    aggregator.fetch(&query).await
                }),
            ));
        }

        let mut fetches = Vec::with_capacity(handles.len());
        for (level, handle) in handles {
            fetches.push(handle.await.unwrap_or_else(|e| LevelFetch {
                level,
                candidates: Vec::new(),
                warnings: vec![Warning::for_level(
                    WarningKind::UpstreamUnavailable,
                    level,
                    format!("aggregator task failed: {}", e),
                )],
                degraded: true,
            }));
        }

        let live: BTreeSet<Level> = fetches.iter().filter(|f| !f.degraded).map(|f| f.level).collect();
        let mut degraded = BTreeSet::new();
        let mut buckets: BTreeMap<Level, Vec<Warning>> = BTreeMap::new();
        let mut candidates = Vec::new();
        for f in fetches {
            if f.degraded {
                degraded.insert(f.level);
            }
            buckets.entry(f.level).or_default().extend(f.warnings);
            candidates.extend(f.candidates);
        }

        // Warnings are stored with the level they concern when that level
        // is cached in this pass, otherwise with the first live level.
        let bucket_for = |level: Option<Level>| level.filter(|l| live.contains(l)).or_else(|| live.first().copied());

        let resolved = self.collision.resolve(candidates);
        for w in resolved.warnings {
            if let Some(b) = bucket_for(w.level) {
                buckets.entry(b).or_default().push(w);
            }
        }

        let county_stem = location.map(|l| reference::name_stem(&l.county));
        let place_stem = place.as_deref().map(reference::name_stem);
        let mut per_level: BTreeMap<Level, Vec<RepresentativeRecord>> = BTreeMap::new();
        for record in resolved.records {
            let level = record.level;
            let local = in_scope(&record, county_stem.as_deref(), place_stem.as_deref());
            if !jurisdiction.applicable_levels.contains(level) {
                if local {
                    warn!(id = %record.id, level = %level, kind = %jurisdiction.kind, "record at non-applicable level excluded");
                    if let Some(b) = bucket_for(Some(level)) {
                        buckets.entry(b).or_default().push(Warning::for_level(
                            WarningKind::LevelNotApplicable,
                            level,
                            format!(
                                "'{}' ({}) excluded: {} level does not apply to a {}",
                                record.name, record.title, level, jurisdiction.kind
                            ),
                        ));
                    }
                }
                continue;
            }
            if !live.contains(&level) {
                debug!(id = %record.id, level = %level, "record for a level not fetched in this pass dropped");
                continue;
            }
            if !local {
                debug!(id = %record.id, level = %level, jurisdiction = %record.jurisdiction,
                    "record for another jurisdiction dropped");
                continue;
            }
            per_level.entry(level).or_default().push(record);
        }

        let mut outcomes = BTreeMap::new();
        for &level in levels {
            let is_degraded = degraded.contains(&level);
            let mut warnings = buckets.remove(&level).unwrap_or_default();
            let records = if is_degraded {
                Vec::new()
            } else {
                let (mut kept, dropped) = self
                    .validator
                    .filter_records(level, per_level.remove(&level).unwrap_or_default());
                warnings.extend(dropped);
                sort_records(&mut kept);
                kept
            };
            let snapshot = LevelSnapshot { records, warnings };
            if !is_degraded {
                let mut tags = location_tags(
                    postal.as_str(),
                    location.map(|l| l.county.as_str()),
                    place.as_deref(),
                );
                tags.extend(snapshot.records.iter().map(|r| format!("rep:{}", r.id)));
                self.cache
                    .put(Category::reps(level), postal.as_str(), &snapshot, &tags, &ticket);
            }
            outcomes.insert(level, LevelOutcome { snapshot, degraded: is_degraded });
        }
        outcomes
    }

    /// Re-fetch one cached key of one level. `Some(false)` when degraded.
    async fn refresh_key(&self, level: Level, key: &str) -> Option<bool> {
        let postal = PostalCode::parse_for(key, self.geo.profile()).ok()?;
        let mut scratch = Vec::new();
        let location = self.locate(&postal, false, &mut scratch).await;
        let jurisdiction = self.classify(location.as_ref(), &postal, false, &mut scratch);
        if !jurisdiction.applicable_levels.contains(level) {
            self.cache.remove(Category::reps(level), key);
            return None;
        }
        let out = self
            .fetch_levels(&postal, location.as_ref(), &jurisdiction, &[level])
            .await;
        out.get(&level).map(|o| !o.degraded)
    }

    async fn refresh(&self, level: Level) -> RefreshReport {
        let keys = self.cache.keys(Category::reps(level));
        let mut report = RefreshReport {
            level,
            keys: keys.len(),
            refreshed: 0,
            degraded: 0,
        };
        for key in keys {
            match self.refresh_key(level, &key).await {
                Some(true) => report.refreshed += 1,
                Some(false) => report.degraded += 1,
                None => {}
            }
        }
        info!(level = %level, keys = report.keys, refreshed = report.refreshed, degraded = report.degraded,
            "level refreshed");
        report
    }

    // ─── Committees ─────────────────────────────────────────────

    async fn fetch_committees(&self, rep_id: &str) -> Result<Vec<CommitteeDetail>, SourceError> {
        let ticket = self.cache.begin_fetch();
        let source = Arc::clone(&self.committees);
        let source_name = source.name().to_string();
        let id = rep_id.to_string();
        let task = tokio::task::spawn_blocking(move || source.committees(&id));
        let details = match tokio::time::timeout(self.committee_timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(SourceError::Unavailable {
                    source_name,
                    message: format!("worker failed: {}", e),
                })
            }
            Err(_) => {
                return Err(SourceError::Timeout {
                    source_name,
                    millis: self.committee_timeout.as_millis() as u64,
                })
            }
        };
        self.cache
            .put(Category::Committees, rep_id, &details, &[format!("rep:{}", rep_id)], &ticket);
        Ok(details)
    }

    async fn committees_for(
        &self,
        ids: &[String],
        include: bool,
        transient: &mut Vec<Warning>,
    ) -> BTreeMap<String, Vec<CommitteeDetail>> {
        let mut out = BTreeMap::new();
        for id in ids {
            if !include {
                if !self.cache.contains(Category::Committees, id) {
                    self.preload.push(PreloadTask::Committees { rep_id: id.clone() }, Priority::Predictive);
                }
                continue;
            }
            if let CacheRead::Hit(details) = self.cache.get::<Vec<CommitteeDetail>>(Category::Committees, id) {
                out.insert(id.clone(), details);
                continue;
            }
            match self.fetch_committees(id).await {
                Ok(details) => {
                    out.insert(id.clone(), details);
                }
                Err(e) => {
                    warn!(rep = %id, error = %e, "committee detail unavailable");
                    transient.push(Warning::new(
                        WarningKind::UpstreamUnavailable,
                        format!("committees for {} unavailable: {}", id, e),
                    ));
                }
            }
        }
        out
    }

    async fn run_preload(&self, task: PreloadTask) {
        match task {
            PreloadTask::Committees { rep_id } => {
                if self.cache.contains(Category::Committees, &rep_id) {
                    return;
                }
                if let Err(e) = self.fetch_committees(&rep_id).await {
                    debug!(rep = %rep_id, error = %e, "committee preload failed");
                }
            }
            PreloadTask::LevelRefresh { level, postal_code } => {
                self.refresh_key(level, &postal_code).await;
            }
        }
    }
}

/// Does a county or municipal record belong to this location's government?
fn in_scope(record: &RepresentativeRecord, county_stem: Option<&str>, place_stem: Option<&str>) -> bool {
    let stem = || reference::name_stem(&record.jurisdiction);
    match record.level {
        Level::Federal | Level::State => true,
        Level::County => county_stem.is_some_and(|c| stem() == c),
        Level::Municipal => place_stem.is_some_and(|p| stem() == p),
    }
}

fn applicability_warnings(j: &Jurisdiction, location: Option<&PostalLocation>) -> Vec<Warning> {
    let mut out = Vec::new();
    if j.applicable_levels.contains(Level::Municipal) {
        return out;
    }
    let place = j
        .place
        .as_deref()
        .or_else(|| location.and_then(|l| l.locality.as_deref()))
        .unwrap_or("this area");
    let explanation = match j.kind {
        JurisdictionType::UnincorporatedArea => format!(
            "{} is unincorporated {}; there is no city government, so no municipal officials apply",
            place,
            j.county.as_deref().unwrap_or("county land")
        ),
        JurisdictionType::CensusDesignatedPlace => format!(
            "{} is a census-designated place governed directly by {}; no municipal officials apply",
            place,
            j.county.as_deref().unwrap_or("its county")
        ),
        _ => "location unresolved; municipal officials cannot be determined".to_string(),
    };
    out.push(Warning::for_level(WarningKind::LevelNotApplicable, Level::Municipal, explanation));
    if !j.applicable_levels.contains(Level::County) {
        out.push(Warning::for_level(
            WarningKind::LevelNotApplicable,
            Level::County,
            "location unresolved; county officials cannot be determined",
        ));
    }
    out
}

// ─── Public handle ──────────────────────────────────────────────

pub struct ResolutionOrchestrator {
    pipeline: Arc<Pipeline>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ResolutionOrchestrator {
    /// Build the pipeline and start the preload workers. Needs a tokio runtime.
    pub fn new(config: &EngineConfig, collaborators: Collaborators) -> Self {
        let geo = match collaborators.geocoder {
            Some(g) => {
                let mut resolver = GeoResolver::new(g);
                resolver.set_offline(config.offline);
                resolver
            }
            None => GeoResolver::builtin_only(),
        };

        let timeout = config.aggregator_timeout();
        let aggregators = [
            (Level::Federal, collaborators.federal),
            (Level::State, collaborators.state),
            (Level::County, collaborators.county),
            (Level::Municipal, collaborators.municipal),
        ]
        .into_iter()
        .map(|(level, source)| (level, Arc::new(LevelAggregator::new(level, source, timeout))))
        .collect();

        let gauge = ForegroundGauge::new();
        let preload = PreloadQueue::new(config.preload_queue_capacity, Arc::clone(&gauge));
        let pipeline = Arc::new(Pipeline {
            geo: Arc::new(geo),
            classifier: JurisdictionClassifier::new(),
            aggregators,
            collision: NameCollisionResolver::new(),
            validator: DataQualityValidator::new(&CALIFORNIA, config.low_confidence_threshold),
            cache: Arc::new(TieredCacheManager::new(config.ttl_policy())),
            committees: collaborators.committees,
            committee_timeout: timeout,
            fanout: Arc::new(Semaphore::new(config.fanout_workers.max(1))),
            gauge,
            preload: Arc::clone(&preload),
        });

        let weak = Arc::downgrade(&pipeline);
        let handler: TaskHandler = Arc::new(move |task: PreloadTask| -> BoxFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(pipeline) = weak.upgrade() {
                    pipeline.run_preload(task).await;
                }
            })
        });
        let workers = preload.spawn_workers(config.preload_workers, handler);

        Self {
            pipeline,
            workers: Mutex::new(workers),
        }
    }

    pub async fn resolve_representation(
        &self,
        postal_code: &str,
        flags: ResolveFlags,
    ) -> Result<AggregateResult, ResolveError> {
        self.pipeline.resolve(postal_code, flags).await
    }

    /// Re-fetch every cached postal code of one level.
    pub async fn refresh(&self, level: Level) -> RefreshReport {
        self.pipeline.refresh(level).await
    }

    /// Queue a background refresh of one level for one postal code.
    pub fn schedule_refresh(&self, level: Level, postal_code: &str, priority: Priority) -> bool {
        self.pipeline.preload.push(
            PreloadTask::LevelRefresh {
                level,
                postal_code: postal_code.to_string(),
            },
            priority,
        )
    }

    pub fn invalidate(&self, event: &str) -> Result<InvalidationReport, CacheError> {
        self.pipeline.cache.invalidate_event(event)
    }

    pub fn invalidate_tag(&self, tag: &str) -> InvalidationReport {
        self.pipeline.cache.invalidate_tag(tag)
    }

    pub fn cache(&self) -> &Arc<TieredCacheManager> {
        &self.pipeline.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.pipeline.cache.stats()
    }

    pub fn preload_stats(&self) -> QueueStats {
        self.pipeline.preload.stats()
    }

    /// Callback for the refresh scheduler.
    pub fn refresh_fn(self: &Arc<Self>) -> RefreshFn {
        let weak = Arc::downgrade(self);
        Arc::new(move |level: Level, _reason: RefreshReason| -> BoxFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(orchestrator) = weak.upgrade() {
                    orchestrator.refresh(level).await;
                }
            })
        })
    }

    /// Stop the preload workers; queued background work is discarded.
    pub async fn shutdown(&self) {
        self.pipeline.preload.shutdown();
        let workers: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut w) => w.drain(..).collect(),
            Err(e) => e.into_inner().drain(..).collect(),
        };
        for w in workers {
            if let Err(e) = w.await {
                warn!(error = %e, "preload worker ended abnormally");
            }
        }
    }
}
