//! Curated reference data for the governed state.
//!
//! Everything here is static and authoritative: the county set, the
//! incorporated-city and census-designated-place registries, the coarse
//! postal table used when geocoding fails, legal district ranges and the
//! forbidden-value set.

pub mod counties;
pub mod places;
pub mod zip_table;

use crate::representatives::Chamber;

/// Static description of the state the engine serves.
#[derive(Debug)]
pub struct StateProfile {
    pub code: &'static str,
    pub name: &'static str,
    /// Inclusive numeric ZIP range assigned to the state.
    pub postal_range: (u32, u32),
    pub lat_range: (f64, f64),
    pub lon_range: (f64, f64),
    pub congressional_districts: u32,
    pub senate_districts: u32,
    pub assembly_districts: u32,
    pub max_county_districts: u32,
    pub max_council_districts: u32,
    pub capital: &'static str,
}

pub const CALIFORNIA: StateProfile = StateProfile {
    code: "CA",
    name: "California",
    postal_range: (90000, 96199),
    lat_range: (32.52, 42.01),
    lon_range: (-124.49, -114.12),
    congressional_districts: 52,
    senate_districts: 40,
    assembly_districts: 80,
    max_county_districts: 11,
    max_council_districts: 15,
    capital: "Sacramento",
};

impl StateProfile {
    pub fn contains_postal(&self, numeric: u32) -> bool {
        numeric >= self.postal_range.0 && numeric <= self.postal_range.1
    }

    pub fn contains_coords(&self, lat: f64, lon: f64) -> bool {
        (self.lat_range.0..=self.lat_range.1).contains(&lat)
            && (self.lon_range.0..=self.lon_range.1).contains(&lon)
    }

    /// Legal district range for a chamber, or `None` when the chamber is
    /// not districted (statewide offices, U.S. Senate, at-large posts).
    pub fn district_bounds(&self, chamber: Chamber) -> Option<(u32, u32)> {
        match chamber {
            Chamber::UsHouse => Some((1, self.congressional_districts)),
            Chamber::StateSenate => Some((1, self.senate_districts)),
            Chamber::StateAssembly => Some((1, self.assembly_districts)),
            Chamber::CountyBoard => Some((1, self.max_county_districts)),
            Chamber::CityCouncil => Some((1, self.max_council_districts)),
            Chamber::UsSenate
            | Chamber::Executive
            | Chamber::CountyOffice
            | Chamber::CityOffice => None,
        }
    }

    /// True when `value` names the state itself, by code or full name.
    pub fn is_state_name(&self, value: &str) -> bool {
        let v = value.trim();
        v.eq_ignore_ascii_case(self.code) || v.eq_ignore_ascii_case(self.name)
    }
}

/// Placeholder and sentinel strings that must never be served.
/// Compared case-insensitively after trimming.
pub const FORBIDDEN_VALUES: &[&str] = &[
    "",
    "unknown",
    "unknown city",
    "unknown county",
    "unknown state",
    "unknown official",
    "n/a",
    "na",
    "none",
    "null",
    "nil",
    "undefined",
    "tbd",
    "tba",
    "placeholder",
    "test",
    "xxx",
    "-",
    "--",
    "?",
    "0",
    "not available",
    "not applicable",
    "no data",
    "default",
    "sample",
    "lorem ipsum",
    "city",
    "county",
    "state",
];

pub fn is_forbidden(value: &str) -> bool {
    let v = value.trim();
    FORBIDDEN_VALUES.iter().any(|f| f.eq_ignore_ascii_case(v))
}

/// True for the origin-coordinate sentinel some geocoders return on failure.
pub fn is_coordinate_sentinel(lat: f64, lon: f64) -> bool {
    !lat.is_finite() || !lon.is_finite() || (lat.abs() < 1e-6 && lon.abs() < 1e-6)
}

/// Lowercased name with jurisdictional decorations removed, used for
/// registry lookups and collision detection.
/// "City of Riverside" → "riverside", "Riverside County" → "riverside".
pub fn name_stem(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut s = lower.as_str();
    for prefix in ["city and county of ", "city of ", "town of ", "county of "] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    for suffix in [" county", " city", " cdp"] {
        if let Some(rest) = s.strip_suffix(suffix) {
            // "Culver City" is a proper name, not a decoration.
            if suffix == " city" && places::is_incorporated_city(name.trim()) {
                break;
            }
            s = rest;
            break;
        }
    }
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
