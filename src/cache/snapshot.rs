//! File-backed cache snapshot at ~/.civic/cache.json.
//!
//! Lets the CLI keep warm partitions across runs. Entries carry their own
//! `cached_at`, so TTLs keep counting while the process is down.
//! Older snapshots without `seq`/`tags` still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::partition::CacheEntry;
use crate::error::SnapshotError;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
}

pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".civic")
        .join("cache.json")
}

pub fn save(path: &Path, entries: &[CacheEntry]) -> Result<usize, SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = SnapshotFile {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        entries: entries.to_vec(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(entries.len())
}

/// A missing file is an empty snapshot.
pub fn load(path: &Path) -> Result<Vec<CacheEntry>, SnapshotError> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let file: SnapshotFile = serde_json::from_str(&data)?;
    Ok(file.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::partition::{Category, TtlClass};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("absent.json")).unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let entry = CacheEntry {
            category: Category::Jurisdiction,
            key: "95683".into(),
            payload: json!({"kind": "unincorporated_area"}),
            ttl_class: TtlClass::Metadata,
            cached_at: Utc::now(),
            seq: 3,
            tags: Default::default(),
        };
        assert_eq!(save(&path, &[entry.clone()]).unwrap(), 1);
        assert_eq!(load(&path).unwrap(), vec![entry]);
    }

    #[test]
    fn test_backward_compatible_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let old = r#"{
            "saved_at": "2026-01-01T00:00:00Z",
            "entries": [{
                "category": "location",
                "key": "95814",
                "payload": {},
                "ttl_class": "historical",
                "cached_at": "2026-01-01T00:00:00Z"
            }]
        }"#;
        fs::write(&path, old).unwrap();
        let entries = load(&path).unwrap();
        assert_eq!(entries[0].seq, 0);
        assert!(entries[0].tags.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Serde(_))));
    }
}
