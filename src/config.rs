//! Engine configuration at ~/.civic/config.json.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! A file that exists but does not parse is an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::TtlPolicy;
use crate::error::ConfigError;
use crate::geo::NominatimGeocoder;
use crate::scheduler::Cadence;
use crate::validation::DEFAULT_LOW_CONFIDENCE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub active_secs: u64,
    pub metadata_secs: u64,
    pub historical_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        let p = TtlPolicy::default();
        Self {
            active_secs: p.active.as_secs(),
            metadata_secs: p.metadata.as_secs(),
            historical_secs: p.historical.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub federal_days: u64,
    pub state_days: u64,
    pub county_days: u64,
    pub municipal_days: u64,
    pub stagger_hours: u64,
    pub tick_secs: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            federal_days: 7,
            state_days: 14,
            county_days: 30,
            municipal_days: 14,
            stagger_hours: 6,
            tick_secs: 60,
        }
    }
}

/// Upstream endpoints and registry files. `None` falls back to the
/// bundled sample registry for that level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub geocoder_url: String,
    pub federal_url: Option<String>,
    pub state_url: Option<String>,
    pub county_registry: Option<PathBuf>,
    pub municipal_registry: Option<PathBuf>,
    pub committee_registry: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            geocoder_url: NominatimGeocoder::DEFAULT_URL.to_string(),
            federal_url: None,
            state_url: None,
            county_registry: None,
            municipal_registry: None,
            committee_registry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ttl: TtlConfig,
    pub cadence: CadenceConfig,
    pub sources: SourcesConfig,
    pub aggregator_timeout_ms: u64,
    pub geocoder_timeout_ms: u64,
    pub fanout_workers: usize,
    pub preload_workers: usize,
    pub preload_queue_capacity: usize,
    pub low_confidence_threshold: f64,
    /// Skip the geocoder and use the bundled postal table only.
    pub offline: bool,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::default(),
            cadence: CadenceConfig::default(),
            sources: SourcesConfig::default(),
            aggregator_timeout_ms: 3000,
            geocoder_timeout_ms: 5000,
            fanout_workers: 4,
            preload_workers: 2,
            preload_queue_capacity: 256,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE,
            offline: false,
            snapshot_path: None,
        }
    }
}

impl EngineConfig {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".civic")
            .join("config.json")
    }

    /// Load from the default location; absent file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicitly named file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            active: Duration::from_secs(self.ttl.active_secs),
            metadata: Duration::from_secs(self.ttl.metadata_secs),
            historical: Duration::from_secs(self.ttl.historical_secs),
        }
    }

    pub fn cadence(&self) -> Cadence {
        let days = |d: u64| Duration::from_secs(d * 24 * 3600);
        Cadence {
            federal: days(self.cadence.federal_days),
            state: days(self.cadence.state_days),
            county: days(self.cadence.county_days),
            municipal: days(self.cadence.municipal_days),
            stagger: Duration::from_secs(self.cadence.stagger_hours * 3600),
            tick: Duration::from_secs(self.cadence.tick_secs.max(1)),
        }
    }

    pub fn aggregator_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregator_timeout_ms)
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_millis(self.geocoder_timeout_ms)
    }
}
