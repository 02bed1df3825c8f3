//! Geo resolver: the geocoder fallback chain.
//!
//! Flow: geocoder → sanity checks → bundled exact table → bundled prefix table → error.
//! Anything that looks like a placeholder or sentinel is treated as an
//! upstream failure, never as data.

use std::sync::Arc;
use tracing::{debug, warn};

use super::providers::{self, Geocoder};
use super::types::{GeoSource, GeocodeHit, PostalCode, PostalLocation};
use crate::error::GeoError;
use crate::reference::{self, counties, zip_table, StateProfile, CALIFORNIA};

/// Confidence multiplier applied when a geocoder answer needed the county
/// filled in from the bundled table.
const FILLED_COUNTY_PENALTY: f64 = 0.75;

pub struct GeoResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
    profile: &'static StateProfile,
    offline: bool,
}

impl GeoResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder: Some(geocoder),
            profile: &CALIFORNIA,
            offline: false,
        }
    }

    /// A resolver that only consults the bundled table.
    pub fn builtin_only() -> Self {
        Self {
            geocoder: None,
            profile: &CALIFORNIA,
            offline: true,
        }
    }

    /// Skip the geocoder and answer from the bundled table.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn profile(&self) -> &'static StateProfile {
        self.profile
    }

    /// Parse and resolve in one step.
    pub fn resolve_input(&self, input: &str) -> Result<PostalLocation, GeoError> {
        let postal = PostalCode::parse_for(input, self.profile)?;
        self.resolve(&postal)
    }

    /// Resolve a parsed postal code through the full fallback chain.
    pub fn resolve(&self, postal: &PostalCode) -> Result<PostalLocation, GeoError> {
        let upstream_failure = match (&self.geocoder, self.offline) {
            (Some(geocoder), false) => match geocoder.geocode(postal) {
                Ok(hit) => match self.accept_hit(postal, hit) {
                    Ok(loc) => {
                        debug!(postal = %postal, county = %loc.county, "geocoder hit accepted");
                        return Ok(loc);
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            },
            (Some(_), true) => GeoError::Network("offline mode".into()),
            (None, _) => GeoError::Network("no geocoder configured".into()),
        };

        warn!(postal = %postal, error = %upstream_failure, "geocoder failed; using bundled table");

        match providers::builtin_lookup(postal) {
            Some(mut loc) => {
                loc.notes.push(format!("geocoder fallback: {}", upstream_failure));
                Ok(loc)
            }
            None => Err(GeoError::Unresolvable(postal.to_string())),
        }
    }

    /// Sanity-check a raw geocoder answer and normalize its county.
    fn accept_hit(&self, postal: &PostalCode, hit: GeocodeHit) -> Result<PostalLocation, GeoError> {
        if reference::is_coordinate_sentinel(hit.lat, hit.lon) {
            return Err(GeoError::Placeholder(format!("sentinel coordinates ({}, {})", hit.lat, hit.lon)));
        }
        if !self.profile.contains_coords(hit.lat, hit.lon) {
            return Err(GeoError::Placeholder(format!(
                "coordinates ({:.4}, {:.4}) outside {}",
                hit.lat, hit.lon, self.profile.name
            )));
        }
        if let Some(ref locality) = hit.locality {
            if reference::is_forbidden(locality) {
                return Err(GeoError::Placeholder(format!("locality '{}'", locality)));
            }
        }

        let mut notes = Vec::new();
        let mut confidence = hit.confidence.clamp(0.0, 1.0);

        let county = match hit.county.as_deref() {
            Some(raw) if reference::is_forbidden(raw) => {
                return Err(GeoError::Placeholder(format!("county '{}'", raw)));
            }
            Some(raw) => counties::normalize(raw)
                .ok_or_else(|| GeoError::InvalidResponse(format!("unrecognized county '{}'", raw)))?
                .to_string(),
            None => {
                let entry = zip_table::prefix(postal.as_str())
                    .ok_or_else(|| GeoError::InvalidResponse("no county in geocoder answer".into()))?;
                notes.push(format!("county filled from bundled table ({})", entry.county));
                confidence *= FILLED_COUNTY_PENALTY;
                entry.county.to_string()
            }
        };

        Ok(PostalLocation {
            postal_code: postal.clone(),
            lat: hit.lat,
            lon: hit.lon,
            county,
            locality: hit.locality.map(|l| l.trim().to_string()),
            confidence,
            source: GeoSource::Geocoder,
            notes,
        })
    }
}
