//! Upstream collaborators that supply raw representative records.
//!
//! Sources are blocking (ureq or in-memory) and return duck-typed JSON;
//! the aggregator owns timeouts and normalization.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::types::CommitteeDetail;
use crate::error::SourceError;
use crate::geo::providers::urlencode;
use crate::jurisdiction::Level;
use crate::reference;

/// What an aggregator asks a source for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub level: Level,
    pub postal_code: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub county: Option<String>,
    pub locality: Option<String>,
}

pub trait RepresentativeSource: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Value>, SourceError>;

    /// Whether everything returned for `level` belongs to that level.
    /// Records from a dedicated source carry the aggregator's level as
    /// their tag; only name-joined sources leave untagged records for
    /// the collision resolver to place.
    fn is_level_dedicated(&self, _level: Level) -> bool {
        true
    }
}

pub trait CommitteeSource: Send + Sync {
    fn name(&self) -> &str;
    fn committees(&self, rep_id: &str) -> Result<Vec<CommitteeDetail>, SourceError>;
}

// ─── HTTP ───────────────────────────────────────────────────────

/// JSON-over-HTTP officials endpoint.
///
/// `GET {base}?level=..&zip=..[&county=..][&city=..][&lat=..&lon=..]`.
/// Accepts a bare array or an object wrapping it under `officials`,
/// `results` or `data`.
pub struct HttpSource {
    name: String,
    base_url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout,
        }
    }

    fn url(&self, q: &SourceQuery) -> String {
        let mut url = format!(
            "{}?level={}&zip={}",
            self.base_url.trim_end_matches('/'),
            q.level,
            urlencode(&q.postal_code)
        );
        if let Some(county) = &q.county {
            url.push_str(&format!("&county={}", urlencode(county)));
        }
        if let Some(city) = &q.locality {
            url.push_str(&format!("&city={}", urlencode(city)));
        }
        if let (Some(lat), Some(lon)) = (q.lat, q.lon) {
            url.push_str(&format!("&lat={:.5}&lon={:.5}", lat, lon));
        }
        url
    }
}

/// Pull the record list out of the envelopes upstreams commonly use.
pub fn unwrap_payload(source_name: &str, payload: Value) -> Result<Vec<Value>, SourceError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => ["officials", "results", "data"]
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| SourceError::InvalidPayload {
                source_name: source_name.to_string(),
                message: "expected an array or an officials/results/data envelope".into(),
            }),
        other => Err(SourceError::InvalidPayload {
            source_name: source_name.to_string(),
            message: format!("unexpected top-level JSON {}", kind_of(&other)),
        }),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RepresentativeSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Value>, SourceError> {
        let response = ureq::get(&self.url(query))
            .set("User-Agent", "CivicLocator/0.1 (representative-lookup)")
            .timeout(self.timeout)
            .call()
            .map_err(|e| SourceError::Unavailable {
                source_name: self.name.clone(),
                message: e.to_string(),
            })?;
        let payload: Value = response.into_json().map_err(|e| SourceError::InvalidPayload {
            source_name: self.name.clone(),
            message: e.to_string(),
        })?;
        unwrap_payload(&self.name, payload)
    }
}

// ─── Registry ───────────────────────────────────────────────────

const BUNDLED_REGISTRY: &str = include_str!("../../data/sample_officials.json");

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    federal: Vec<Value>,
    #[serde(default)]
    state: Vec<Value>,
    /// County and city officials, keyed only by jurisdiction name.
    #[serde(default)]
    local: Vec<Value>,
    #[serde(default)]
    committees: HashMap<String, Vec<CommitteeDetail>>,
}

/// Officials registry held in memory.
///
/// Federal and state entries match when their `zips` list contains the
/// postal code, or when they carry no `zips` (statewide seats). Local
/// entries are joined on the name stem of their `jurisdiction`, so a
/// county query for "Riverside County" also returns the officials of the
/// city of Riverside. The collision resolver sorts that out downstream.
pub struct RegistrySource {
    name: String,
    data: RegistryFile,
}

impl RegistrySource {
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, SourceError> {
        let name = name.into();
        let data = serde_json::from_str(json).map_err(|e| SourceError::InvalidPayload {
            source_name: name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { name, data })
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let name = format!("registry:{}", path.display());
        let json = std::fs::read_to_string(path).map_err(|e| SourceError::Unavailable {
            source_name: name.clone(),
            message: e.to_string(),
        })?;
        Self::from_json(name, &json)
    }

    /// The sample registry compiled into the binary.
    pub fn bundled() -> Result<Self, SourceError> {
        Self::from_json("bundled-registry", BUNDLED_REGISTRY)
    }

    pub fn len(&self) -> usize {
        self.data.federal.len() + self.data.state.len() + self.data.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn covers_zip(entry: &Value, postal: &str) -> bool {
        match entry.get("zips").and_then(Value::as_array) {
            Some(zips) => zips.iter().any(|z| z.as_str() == Some(postal)),
            None => true,
        }
    }
}

impl RepresentativeSource for RegistrySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Value>, SourceError> {
        let pool: Vec<Value> = match query.level {
            Level::Federal => self.data.federal.clone(),
            Level::State => self.data.state.clone(),
            Level::County | Level::Municipal => {
                let key = match query.level {
                    Level::County => query.county.as_deref(),
                    _ => query.locality.as_deref(),
                };
                let Some(key) = key.map(reference::name_stem) else {
                    return Ok(Vec::new());
                };
                self.data
                    .local
                    .iter()
                    .filter(|e| {
                        e.get("jurisdiction")
                            .and_then(Value::as_str)
                            .is_some_and(|j| reference::name_stem(j) == key)
                    })
                    .cloned()
                    .collect()
            }
        };
        Ok(pool
            .into_iter()
            .filter(|e| Self::covers_zip(e, &query.postal_code))
            .collect())
    }

    fn is_level_dedicated(&self, level: Level) -> bool {
        matches!(level, Level::Federal | Level::State)
    }
}

impl CommitteeSource for RegistrySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn committees(&self, rep_id: &str) -> Result<Vec<CommitteeDetail>, SourceError> {
        Ok(self.data.committees.get(rep_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(level: Level, zip: &str, county: Option<&str>, locality: Option<&str>) -> SourceQuery {
        SourceQuery {
            level,
            postal_code: zip.into(),
            lat: None,
            lon: None,
            county: county.map(String::from),
            locality: locality.map(String::from),
        }
    }

    #[test]
    fn test_unwrap_payload_envelopes() {
        assert_eq!(unwrap_payload("t", json!([{"id": 1}])).unwrap().len(), 1);
        assert_eq!(unwrap_payload("t", json!({"officials": [{}, {}]})).unwrap().len(), 2);
        assert_eq!(unwrap_payload("t", json!({"data": []})).unwrap().len(), 0);
        assert!(unwrap_payload("t", json!({"items": []})).is_err());
        assert!(unwrap_payload("t", json!("nope")).is_err());
    }

    #[test]
    fn test_http_url_encoding() {
        let src = HttpSource::new("http", "https://api.example.org/officials/", Duration::from_secs(1));
        let url = src.url(&query(Level::County, "95814", Some("Sacramento County"), None));
        assert_eq!(
            url,
            "https://api.example.org/officials?level=county&zip=95814&county=Sacramento%20County"
        );
    }

    #[test]
    fn test_registry_zip_filter() {
        let reg = RegistrySource::from_json(
            "t",
            r#"{"federal": [
                {"id": "s1", "title": "U.S. Senator"},
                {"id": "h7", "title": "Representative", "zips": ["95814"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(reg.fetch(&query(Level::Federal, "95814", None, None)).unwrap().len(), 2);
        assert_eq!(reg.fetch(&query(Level::Federal, "92501", None, None)).unwrap().len(), 1);
    }

    #[test]
    fn test_registry_local_join_is_name_keyed() {
        let reg = RegistrySource::from_json(
            "t",
            r#"{"local": [
                {"id": "c1", "title": "Supervisor", "jurisdiction": "Riverside County"},
                {"id": "m1", "title": "Mayor", "jurisdiction": "Riverside"},
                {"id": "m2", "title": "Mayor", "jurisdiction": "Fresno"}
            ]}"#,
        )
        .unwrap();
        let county = reg
            .fetch(&query(Level::County, "92501", Some("Riverside County"), Some("Riverside")))
            .unwrap();
        assert_eq!(county.len(), 2);
        assert!(reg.fetch(&query(Level::Municipal, "92501", None, None)).unwrap().is_empty());
    }

    #[test]
    fn test_bundled_registry_parses() {
        let reg = RegistrySource::bundled().unwrap();
        assert!(!reg.is_empty());
        let capital = reg
            .fetch(&query(Level::Municipal, "95814", Some("Sacramento County"), Some("Sacramento")))
            .unwrap();
        assert!(!capital.is_empty());
        assert!(!CommitteeSource::committees(&reg, "ca-sen-1").unwrap().is_empty());
    }
}
