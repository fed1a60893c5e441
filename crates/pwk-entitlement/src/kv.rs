//! Key-value persistence seam for the entitlement flag.
//!
//! Two implementations:
//! - [`MemoryKv`]: shared in-process map. Clones share storage, so a second
//!   store opened on a clone behaves like a process restart.
//! - [`JsonFileKv`]: one JSON object on disk, replaced atomically
//!   (write temp file, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Boolean key-value persistence.
///
/// A missing key is `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryKv
// ---------------------------------------------------------------------------

#[derive(Clone, Default, Debug)]
pub struct MemoryKv {
    inner: Arc<MemoryInner>,
}

#[derive(Default, Debug)]
struct MemoryInner {
    map: Mutex<BTreeMap<String, bool>>,
    writes: AtomicU64,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_bool` / `remove` calls observed across all clones.
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryKv {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_string(), value);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(key);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileKv
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileDoc {
    #[serde(default)]
    entries: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    value: bool,
    updated_at: DateTime<Utc>,
}

/// File-backed store. The file is created on first write.
#[derive(Debug)]
pub struct JsonFileKv {
    path: PathBuf,
    io: Mutex<()>,
}

impl JsonFileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_doc(&self) -> Result<FileDoc> {
        if !self.path.exists() {
            return Ok(FileDoc::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(FileDoc::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid entitlement file {}", self.path.display()))
    }

    fn write_doc(&self, doc: &FileDoc) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let body = serde_json::to_string_pretty(doc).context("entitlement file serialize failed")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileKv {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let _io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_doc()?.entries.get(key).map(|e| e.value))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let _io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read_doc()?;
        doc.entries.insert(
            key.to_string(),
            FileEntry {
                value,
                updated_at: Utc::now(),
            },
        );
        self.write_doc(&doc)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read_doc()?;
        if doc.entries.remove(key).is_some() {
            self.write_doc(&doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_storage() {
        let a = MemoryKv::new();
        let b = a.clone();
        a.set_bool("k", true).unwrap();
        assert_eq!(b.get_bool("k").unwrap(), Some(true));
        assert_eq!(b.get_bool("missing").unwrap(), None);
        assert_eq!(b.writes(), 1);
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entitlement.json");
        let kv = JsonFileKv::new(&path);

        assert_eq!(kv.get_bool("is_premium").unwrap(), None);
        kv.set_bool("is_premium", true).unwrap();
        assert!(path.exists());

        let reopened = JsonFileKv::new(&path);
        assert_eq!(reopened.get_bool("is_premium").unwrap(), Some(true));

        reopened.remove("is_premium").unwrap();
        assert_eq!(kv.get_bool("is_premium").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entitlement.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileKv::new(&path).get_bool("is_premium").is_err());
    }
}
