//! Geocoding providers: Nominatim postal search and the bundled coarse table.

use serde::Deserialize;
use std::time::Duration;

use super::types::{GeoSource, GeocodeHit, PostalCode, PostalLocation};
use crate::error::GeoError;
use crate::reference::zip_table;

/// A geocoding collaborator. Implementations may block.
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;
    fn geocode(&self, postal: &PostalCode) -> Result<GeocodeHit, GeoError>;
}

// ─── Built-in dataset ───────────────────────────────────────────

/// Look up the bundled table: exact entries first, then the 3-digit prefix.
pub fn builtin_lookup(postal: &PostalCode) -> Option<PostalLocation> {
    if let Some(e) = zip_table::exact(postal.as_str()) {
        return Some(PostalLocation {
            postal_code: postal.clone(),
            lat: e.lat,
            lon: e.lon,
            county: e.county.to_string(),
            locality: Some(e.locality.to_string()),
            confidence: zip_table::EXACT_CONFIDENCE,
            source: GeoSource::BuiltinExact,
            notes: Vec::new(),
        });
    }

    zip_table::prefix(postal.as_str()).map(|e| PostalLocation {
        postal_code: postal.clone(),
        lat: e.lat,
        lon: e.lon,
        county: e.county.to_string(),
        locality: None,
        confidence: zip_table::PREFIX_CONFIDENCE,
        source: GeoSource::BuiltinPrefix,
        notes: Vec::new(),
    })
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct NominatimAddress {
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    hamlet: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
}

impl NominatimAddress {
    fn locality(&self) -> Option<String> {
        self.city
            .clone()
            .or_else(|| self.town.clone())
            .or_else(|| self.village.clone())
            .or_else(|| self.hamlet.clone())
            .or_else(|| self.suburb.clone())
    }
}

/// OpenStreetMap Nominatim postal-code search, restricted to one state.
pub struct NominatimGeocoder {
    base_url: String,
    state_name: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub const DEFAULT_URL: &'static str = "https://nominatim.openstreetmap.org";

    pub fn new(base_url: impl Into<String>, state_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            state_name: state_name.into(),
            timeout,
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    fn geocode(&self, postal: &PostalCode) -> Result<GeocodeHit, GeoError> {
        let url = format!(
            "{}/search?postalcode={}&state={}&countrycodes=us&format=json&addressdetails=1&limit=3",
            self.base_url.trim_end_matches('/'),
            postal,
            urlencode(&self.state_name),
        );

        let response = ureq::get(&url)
            .set("User-Agent", "CivicLocator/0.1 (representative-lookup)")
            .timeout(self.timeout)
            .call()
            .map_err(|e| GeoError::Network(e.to_string()))?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| GeoError::InvalidResponse(e.to_string()))?;

        let top = results
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::NotFound(postal.to_string()))?;

        let lat: f64 = top
            .lat
            .parse()
            .map_err(|_| GeoError::InvalidResponse(format!("bad latitude '{}'", top.lat)))?;
        let lon: f64 = top
            .lon
            .parse()
            .map_err(|_| GeoError::InvalidResponse(format!("bad longitude '{}'", top.lon)))?;
        let address = top.address.unwrap_or_default();

        Ok(GeocodeHit {
            lat,
            lon,
            county: address.county.clone(),
            locality: address.locality(),
            confidence: top.importance.map(|i| (0.6 + i).min(0.95)).unwrap_or(0.8),
        })
    }
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

pub(crate) fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            _ if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '~' => {
                c.to_string()
            }
            _ => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_exact() {
        let loc = builtin_lookup(&PostalCode::parse("95814").unwrap()).unwrap();
        assert_eq!(loc.locality.as_deref(), Some("Sacramento"));
        assert_eq!(loc.county, "Sacramento County");
        assert_eq!(loc.source, GeoSource::BuiltinExact);
        approx::assert_abs_diff_eq!(loc.lat, 38.5816, epsilon = 1e-4);
    }

    #[test]
    fn test_builtin_prefix_has_no_locality() {
        let loc = builtin_lookup(&PostalCode::parse("95821").unwrap()).unwrap();
        assert_eq!(loc.county, "Sacramento County");
        assert!(loc.locality.is_none());
        assert_eq!(loc.source, GeoSource::BuiltinPrefix);
        assert!(loc.confidence < zip_table::EXACT_CONFIDENCE);
    }

    #[test]
    fn test_builtin_miss() {
        // 918xx is not in the prefix table.
        assert!(builtin_lookup(&PostalCode::parse("91801").unwrap()).is_none());
    }

    #[test]
    fn test_nominatim_address_locality_order() {
        let addr = NominatimAddress {
            town: Some("Truckee".into()),
            suburb: Some("Downtown".into()),
            ..Default::default()
        };
        assert_eq!(addr.locality().as_deref(), Some("Truckee"));
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("Santa Cruz"), "Santa%20Cruz");
        assert_eq!(urlencode("a&b"), "a%26b");
        assert_eq!(urlencode("é"), "%C3%A9");
    }
}
