#![allow(dead_code)]

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use civic_locator::config::EngineConfig;
use civic_locator::error::SourceError;
use civic_locator::jurisdiction::Level;
use civic_locator::representatives::{RegistrySource, RepresentativeSource, SourceQuery};
use civic_locator::{Collaborators, ResolutionOrchestrator};

/// In-memory source that counts upstream calls and can be made slow.
pub struct CountingSource {
    inner: Arc<RegistrySource>,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingSource {
    pub fn new(inner: Arc<RegistrySource>) -> Arc<Self> {
        Self::slow(inner, Duration::ZERO)
    }

    pub fn slow(inner: Arc<RegistrySource>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RepresentativeSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Value>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.fetch(query)
    }

    fn is_level_dedicated(&self, level: Level) -> bool {
        self.inner.is_level_dedicated(level)
    }
}

/// Level-dedicated source serving the same records for every query.
pub struct FixedSource(pub Vec<Value>);

impl RepresentativeSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch(&self, _query: &SourceQuery) -> Result<Vec<Value>, SourceError> {
        Ok(self.0.clone())
    }
}

/// Source whose upstream always refuses the connection.
pub struct FailingSource;

impl RepresentativeSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    fn fetch(&self, _query: &SourceQuery) -> Result<Vec<Value>, SourceError> {
        Err(SourceError::Unavailable {
            source_name: "failing".into(),
            message: "connection refused".into(),
        })
    }
}

/// Orchestrator over explicit per-level sources, committees from the bundled registry.
pub fn orchestrator_with(
    federal: Arc<dyn RepresentativeSource>,
    state: Arc<dyn RepresentativeSource>,
    county: Arc<dyn RepresentativeSource>,
    municipal: Arc<dyn RepresentativeSource>,
) -> ResolutionOrchestrator {
    let collaborators = Collaborators {
        geocoder: None,
        federal,
        state,
        county,
        municipal,
        committees: Arc::new(RegistrySource::bundled().unwrap()),
    };
    ResolutionOrchestrator::new(&test_config(), collaborators)
}

pub struct Harness {
    pub orchestrator: ResolutionOrchestrator,
    pub federal: Arc<CountingSource>,
    pub state: Arc<CountingSource>,
    pub county: Arc<CountingSource>,
    pub municipal: Arc<CountingSource>,
}

impl Harness {
    pub fn calls(&self) -> [usize; 4] {
        [
            self.federal.calls(),
            self.state.calls(),
            self.county.calls(),
            self.municipal.calls(),
        ]
    }

    pub fn total_calls(&self) -> usize {
        self.calls().iter().sum()
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        offline: true,
        aggregator_timeout_ms: 200,
        ..EngineConfig::default()
    }
}

/// Orchestrator over `registry` with every level counted.
pub fn harness_with(registry: RegistrySource, municipal_delay: Duration) -> Harness {
    let registry = Arc::new(registry);
    let federal = CountingSource::new(Arc::clone(&registry));
    let state = CountingSource::new(Arc::clone(&registry));
    let county = CountingSource::new(Arc::clone(&registry));
    let municipal = CountingSource::slow(Arc::clone(&registry), municipal_delay);
    let collaborators = Collaborators {
        geocoder: None,
        federal: federal.clone(),
        state: state.clone(),
        county: county.clone(),
        municipal: municipal.clone(),
        committees: registry,
    };
    Harness {
        orchestrator: ResolutionOrchestrator::new(&test_config(), collaborators),
        federal,
        state,
        county,
        municipal,
    }
}

pub fn harness() -> Harness {
    harness_with(RegistrySource::bundled().unwrap(), Duration::ZERO)
}

pub fn ids(records: &[civic_locator::representatives::RepresentativeRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}
