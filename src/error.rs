//! Error taxonomy for the resolution engine.
//!
//! Only [`ResolveError::InputValidation`] ever reaches a caller of
//! `resolve_representation`. Every other condition is recovered where it
//! happens and surfaced as a [`Warning`] on the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::jurisdiction::Level;

/// Hard failures returned to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid postal code '{input}': {reason}")]
    InputValidation { input: String, reason: String },
}

/// Failures raised by the geocoding side.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error(transparent)]
    Input(#[from] ResolveError),
    #[error("geocoder network error: {0}")]
    Network(String),
    #[error("geocoder returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("geocoder has no result for {0}")]
    NotFound(String),
    #[error("geocoder returned placeholder data: {0}")]
    Placeholder(String),
    #[error("postal code {0} could not be resolved by any provider")]
    Unresolvable(String),
}

/// Failures raised by a representative or committee collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} unreachable: {message}")]
    Unavailable { source_name: String, message: String },
    #[error("{source_name} returned an invalid payload: {message}")]
    InvalidPayload { source_name: String, message: String },
    #[error("{source_name} timed out after {millis} ms")]
    Timeout { source_name: String, millis: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Read { path: String, message: String },
    #[error("malformed config {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("unknown invalidation event '{0}'")]
    UnknownEvent(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("a refresh scheduler is already running in this process")]
    AlreadyRunning,
    #[error("refresh scheduler is not running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The recoverable conditions that are reported as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UpstreamUnavailable,
    DataQualityViolation,
    AmbiguousClassification,
    CacheCorruption,
    LowConfidence,
    LevelNotApplicable,
    LevelConflict,
    NameCollision,
    GeocodeFallback,
    UnusualValue,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::DataQualityViolation => "data_quality_violation",
            Self::AmbiguousClassification => "ambiguous_classification",
            Self::CacheCorruption => "cache_corruption",
            Self::LowConfidence => "low_confidence",
            Self::LevelNotApplicable => "level_not_applicable",
            Self::LevelConflict => "level_conflict",
            Self::NameCollision => "name_collision",
            Self::GeocodeFallback => "geocode_fallback",
            Self::UnusualValue => "unusual_value",
        };
        f.write_str(s)
    }
}

/// A non-fatal condition attached to an aggregate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            level: None,
            message: message.into(),
        }
    }

    pub fn for_level(kind: WarningKind, level: Level, message: impl Into<String>) -> Self {
        Self {
            kind,
            level: Some(level),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(f, "[{}/{}] {}", self.kind, level, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
