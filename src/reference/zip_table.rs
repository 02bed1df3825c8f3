//! Bundled coarse postal table, used when the geocoding collaborator fails.
//!
//! Two tiers: exact 5-digit entries that carry a locality, and 3-digit
//! prefix entries that only pin the county (centroid of the county seat).

pub struct ZipEntry {
    pub zip: &'static str,
    pub locality: &'static str,
    pub county: &'static str,
    pub lat: f64,
    pub lon: f64,
}

pub struct PrefixEntry {
    pub prefix: &'static str,
    pub county: &'static str,
    pub lat: f64,
    pub lon: f64,
}

pub const EXACT_CONFIDENCE: f64 = 0.7;
pub const PREFIX_CONFIDENCE: f64 = 0.4;

pub const EXACT: &[ZipEntry] = &[
    ZipEntry { zip: "95814", locality: "Sacramento", county: "Sacramento County", lat: 38.5816, lon: -121.4944 },
    ZipEntry { zip: "95608", locality: "Carmichael", county: "Sacramento County", lat: 38.6171, lon: -121.3283 },
    ZipEntry { zip: "95628", locality: "Fair Oaks", county: "Sacramento County", lat: 38.6446, lon: -121.2722 },
    ZipEntry { zip: "95662", locality: "Orangevale", county: "Sacramento County", lat: 38.6785, lon: -121.2258 },
    ZipEntry { zip: "95843", locality: "Antelope", county: "Sacramento County", lat: 38.7082, lon: -121.3300 },
    ZipEntry { zip: "95660", locality: "North Highlands", county: "Sacramento County", lat: 38.6857, lon: -121.3722 },
    ZipEntry { zip: "95864", locality: "Arden-Arcade", county: "Sacramento County", lat: 38.5860, lon: -121.3770 },
    ZipEntry { zip: "95683", locality: "Sloughhouse", county: "Sacramento County", lat: 38.4960, lon: -121.1910 },
    ZipEntry { zip: "95624", locality: "Elk Grove", county: "Sacramento County", lat: 38.4088, lon: -121.3716 },
    ZipEntry { zip: "95630", locality: "Folsom", county: "Sacramento County", lat: 38.6780, lon: -121.1761 },
    ZipEntry { zip: "95616", locality: "Davis", county: "Yolo County", lat: 38.5449, lon: -121.7405 },
    ZipEntry { zip: "95762", locality: "El Dorado Hills", county: "El Dorado County", lat: 38.6857, lon: -121.0822 },
    ZipEntry { zip: "92501", locality: "Riverside", county: "Riverside County", lat: 33.9806, lon: -117.3755 },
    ZipEntry { zip: "92570", locality: "Mead Valley", county: "Riverside County", lat: 33.8336, lon: -117.2961 },
    ZipEntry { zip: "90012", locality: "Los Angeles", county: "Los Angeles County", lat: 34.0614, lon: -118.2385 },
    ZipEntry { zip: "90022", locality: "East Los Angeles", county: "Los Angeles County", lat: 34.0239, lon: -118.1720 },
    ZipEntry { zip: "91001", locality: "Altadena", county: "Los Angeles County", lat: 34.1897, lon: -118.1312 },
    ZipEntry { zip: "94102", locality: "San Francisco", county: "San Francisco County", lat: 37.7793, lon: -122.4193 },
    ZipEntry { zip: "94612", locality: "Oakland", county: "Alameda County", lat: 37.8044, lon: -122.2712 },
    ZipEntry { zip: "94546", locality: "Castro Valley", county: "Alameda County", lat: 37.6941, lon: -122.0864 },
    ZipEntry { zip: "95113", locality: "San Jose", county: "Santa Clara County", lat: 37.3337, lon: -121.8907 },
    ZipEntry { zip: "92101", locality: "San Diego", county: "San Diego County", lat: 32.7157, lon: -117.1611 },
    ZipEntry { zip: "91977", locality: "Spring Valley", county: "San Diego County", lat: 32.7254, lon: -116.9987 },
    ZipEntry { zip: "93721", locality: "Fresno", county: "Fresno County", lat: 36.7378, lon: -119.7871 },
    ZipEntry { zip: "93117", locality: "Isla Vista", county: "Santa Barbara County", lat: 34.4133, lon: -119.8610 },
    ZipEntry { zip: "96161", locality: "Truckee", county: "Nevada County", lat: 39.3280, lon: -120.1833 },
];

pub const PREFIXES: &[PrefixEntry] = &[
    PrefixEntry { prefix: "900", county: "Los Angeles County", lat: 34.0522, lon: -118.2437 },
    PrefixEntry { prefix: "902", county: "Los Angeles County", lat: 33.9164, lon: -118.3526 },
    PrefixEntry { prefix: "903", county: "Los Angeles County", lat: 33.9617, lon: -118.3531 },
    PrefixEntry { prefix: "904", county: "Los Angeles County", lat: 34.0195, lon: -118.4912 },
    PrefixEntry { prefix: "905", county: "Los Angeles County", lat: 33.8358, lon: -118.3406 },
    PrefixEntry { prefix: "906", county: "Los Angeles County", lat: 33.9792, lon: -118.0328 },
    PrefixEntry { prefix: "907", county: "Los Angeles County", lat: 33.7701, lon: -118.1937 },
    PrefixEntry { prefix: "908", county: "Los Angeles County", lat: 33.7701, lon: -118.1937 },
    PrefixEntry { prefix: "910", county: "Los Angeles County", lat: 34.1478, lon: -118.1445 },
    PrefixEntry { prefix: "911", county: "Los Angeles County", lat: 34.1478, lon: -118.1445 },
    PrefixEntry { prefix: "912", county: "Los Angeles County", lat: 34.1425, lon: -118.2551 },
    PrefixEntry { prefix: "913", county: "Los Angeles County", lat: 34.1808, lon: -118.3090 },
    PrefixEntry { prefix: "919", county: "San Diego County", lat: 32.6401, lon: -117.0842 },
    PrefixEntry { prefix: "920", county: "San Diego County", lat: 33.1192, lon: -117.0864 },
    PrefixEntry { prefix: "921", county: "San Diego County", lat: 32.7157, lon: -117.1611 },
    PrefixEntry { prefix: "922", county: "Riverside County", lat: 33.7206, lon: -116.2156 },
    PrefixEntry { prefix: "923", county: "San Bernardino County", lat: 34.1083, lon: -117.2898 },
    PrefixEntry { prefix: "924", county: "San Bernardino County", lat: 34.1083, lon: -117.2898 },
    PrefixEntry { prefix: "925", county: "Riverside County", lat: 33.9533, lon: -117.3962 },
    PrefixEntry { prefix: "926", county: "Orange County", lat: 33.7455, lon: -117.8677 },
    PrefixEntry { prefix: "927", county: "Orange County", lat: 33.7455, lon: -117.8677 },
    PrefixEntry { prefix: "928", county: "Orange County", lat: 33.8366, lon: -117.9143 },
    PrefixEntry { prefix: "930", county: "Ventura County", lat: 34.2746, lon: -119.2290 },
    PrefixEntry { prefix: "931", county: "Santa Barbara County", lat: 34.4208, lon: -119.6982 },
    PrefixEntry { prefix: "932", county: "Kern County", lat: 35.3733, lon: -119.0187 },
    PrefixEntry { prefix: "933", county: "Kern County", lat: 35.3733, lon: -119.0187 },
    PrefixEntry { prefix: "934", county: "Santa Barbara County", lat: 34.9530, lon: -120.4357 },
    PrefixEntry { prefix: "935", county: "Kern County", lat: 35.0525, lon: -118.1739 },
    PrefixEntry { prefix: "936", county: "Fresno County", lat: 36.7378, lon: -119.7871 },
    PrefixEntry { prefix: "937", county: "Fresno County", lat: 36.7378, lon: -119.7871 },
    PrefixEntry { prefix: "939", county: "Monterey County", lat: 36.6777, lon: -121.6555 },
    PrefixEntry { prefix: "940", county: "San Mateo County", lat: 37.4852, lon: -122.2364 },
    PrefixEntry { prefix: "941", county: "San Francisco County", lat: 37.7749, lon: -122.4194 },
    PrefixEntry { prefix: "943", county: "Santa Clara County", lat: 37.4419, lon: -122.1430 },
    PrefixEntry { prefix: "944", county: "San Mateo County", lat: 37.5630, lon: -122.3255 },
    PrefixEntry { prefix: "945", county: "Alameda County", lat: 37.6688, lon: -122.0808 },
    PrefixEntry { prefix: "946", county: "Alameda County", lat: 37.8044, lon: -122.2712 },
    PrefixEntry { prefix: "947", county: "Alameda County", lat: 37.8716, lon: -122.2727 },
    PrefixEntry { prefix: "948", county: "Contra Costa County", lat: 38.0194, lon: -122.1341 },
    PrefixEntry { prefix: "949", county: "Marin County", lat: 37.9735, lon: -122.5311 },
    PrefixEntry { prefix: "950", county: "Santa Clara County", lat: 37.3382, lon: -121.8863 },
    PrefixEntry { prefix: "951", county: "Santa Clara County", lat: 37.3382, lon: -121.8863 },
    PrefixEntry { prefix: "952", county: "San Joaquin County", lat: 37.9577, lon: -121.2908 },
    PrefixEntry { prefix: "953", county: "Stanislaus County", lat: 37.6391, lon: -120.9969 },
    PrefixEntry { prefix: "954", county: "Sonoma County", lat: 38.4404, lon: -122.7141 },
    PrefixEntry { prefix: "955", county: "Humboldt County", lat: 40.8021, lon: -124.1637 },
    PrefixEntry { prefix: "956", county: "Sacramento County", lat: 38.5816, lon: -121.4944 },
    PrefixEntry { prefix: "957", county: "Sacramento County", lat: 38.5816, lon: -121.4944 },
    PrefixEntry { prefix: "958", county: "Sacramento County", lat: 38.5816, lon: -121.4944 },
    PrefixEntry { prefix: "959", county: "Yuba County", lat: 39.1457, lon: -121.5914 },
    PrefixEntry { prefix: "960", county: "Shasta County", lat: 40.5865, lon: -122.3917 },
    PrefixEntry { prefix: "961", county: "Nevada County", lat: 39.2616, lon: -121.0161 },
];

pub fn exact(zip: &str) -> Option<&'static ZipEntry> {
    EXACT.iter().find(|e| e.zip == zip)
}

pub fn prefix(zip: &str) -> Option<&'static PrefixEntry> {
    let p = zip.get(..3)?;
    PREFIXES.iter().find(|e| e.prefix == p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{counties, CALIFORNIA};

    #[test]
    fn test_all_entries_valid() {
        for e in EXACT {
            assert!(counties::is_authoritative(e.county), "{}", e.zip);
            assert!(CALIFORNIA.contains_coords(e.lat, e.lon), "{}", e.zip);
        }
        for e in PREFIXES {
            assert!(counties::is_authoritative(e.county), "{}", e.prefix);
            assert!(CALIFORNIA.contains_coords(e.lat, e.lon), "{}", e.prefix);
        }
    }

    #[test]
    fn test_exact_and_prefix_lookup() {
        assert_eq!(exact("95814").unwrap().locality, "Sacramento");
        assert!(exact("95815").is_none());
        assert_eq!(prefix("95815").unwrap().county, "Sacramento County");
        assert!(prefix("96").is_none());
    }
}
