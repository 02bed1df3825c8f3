//! Core types for the geocoding side.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResolveError;
use crate::reference::{StateProfile, CALIFORNIA};

/// A syntactically valid 5-digit postal code inside the governed state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse against the default state profile.
    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        Self::parse_for(input, &CALIFORNIA)
    }

    /// Accepts `NNNNN` and `NNNNN-NNNN`; the +4 suffix is dropped.
    pub fn parse_for(input: &str, profile: &StateProfile) -> Result<Self, ResolveError> {
        let invalid = |reason: &str| ResolveError::InputValidation {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty postal code"));
        }

        let five = match trimmed.split_once('-') {
            Some((head, plus4)) => {
                if plus4.len() != 4 || !plus4.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("ZIP+4 suffix must be four digits"));
                }
                head
            }
            None => trimmed,
        };

        if five.len() != 5 || !five.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected five digits"));
        }
        if five == "00000" {
            return Err(invalid("all-zero sentinel"));
        }

        let numeric: u32 = five.parse().map_err(|_| invalid("expected five digits"))?;
        if !profile.contains_postal(numeric) {
            return Err(invalid(&format!(
                "outside {} range {:05}-{:05}",
                profile.code, profile.postal_range.0, profile.postal_range.1
            )));
        }

        Ok(Self(five.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a location was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoSource {
    Geocoder,
    BuiltinExact,
    BuiltinPrefix,
}

impl fmt::Display for GeoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geocoder => write!(f, "Geocoder"),
            Self::BuiltinExact => write!(f, "Built-in"),
            Self::BuiltinPrefix => write!(f, "Built-in (county)"),
        }
    }
}

/// A postal code resolved to coordinates, county and a locality guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalLocation {
    pub postal_code: PostalCode,
    pub lat: f64,
    pub lon: f64,
    /// Authoritative county name, suffix included.
    pub county: String,
    /// Raw locality guess from the provider; not a jurisdiction.
    #[serde(default)]
    pub locality: Option<String>,
    pub confidence: f64,
    pub source: GeoSource,
    /// Provenance notes (fallback reasons, filled-in fields).
    #[serde(default)]
    pub notes: Vec<String>,
}

impl PostalLocation {
    pub fn display_line(&self) -> String {
        let place = self.locality.as_deref().unwrap_or("(no locality)");
        format!(
            "{} \u{2014} {}, {} ({:.4}, {:.4}) via {}",
            self.postal_code, place, self.county, self.lat, self.lon, self.source
        )
    }
}

/// Raw answer from a geocoding collaborator, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub lat: f64,
    pub lon: f64,
    pub county: Option<String>,
    pub locality: Option<String>,
    pub confidence: f64,
}
