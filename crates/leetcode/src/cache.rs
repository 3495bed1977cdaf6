//! Expiring key-value cache for widget data.
//!
//! Values are stored as JSON envelopes `{"lastUpdated": <ms>, "data": ...}`
//! through a [`CacheBackend`]. Reads never fail: a missing, expired or
//! unparsable entry is a miss, and a broken backend degrades to always-miss.

use common::{WidgetError, WidgetResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};

pub const STATS_CACHE_KEY: &str = "leetcode_stats_data";
pub const BADGES_CACHE_KEY: &str = "leetcode_badges_data";
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

pub trait CacheBackend: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One JSON file per key inside `dir`.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl CacheBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "cache lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "cache lock poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        if let Ok(mut guard) = self.entries.lock() {
            guard.remove(key);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub last_updated: i64,
    pub data: T,
}

pub struct Cache {
    backend: Option<Arc<dyn CacheBackend>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            clock,
            ttl,
        }
    }

    /// A cache with no persistence surface: every read misses.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: None,
            clock,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.get_even_if_expired(key)?;
        let age = self.clock.now_millis() - entry.last_updated;
        if age > self.ttl.as_millis() as i64 {
            debug!("Cache entry {} expired ({} ms old)", key, age);
            return None;
        }
        Some(entry)
    }

    pub fn get_even_if_expired<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let backend = self.backend.as_ref()?;
        let raw = match backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading cache entry {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Encoding failures are returned; storage failures are logged only.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> WidgetResult<()> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };

        let entry = CacheEntry {
            last_updated: self.clock.now_millis(),
            data: value,
        };
        let encoded = serde_json::to_string(&entry)
            .map_err(|e| WidgetError::Cache(format!("Failed to encode {}: {}", key, e)))?;

        if let Err(e) = backend.write(key, &encoded) {
            warn!("Error saving cache entry {}: {}", key, e);
        }
        Ok(())
    }

    pub fn clear(&self, key: &str) {
        if let Some(backend) = self.backend.as_ref() {
            if let Err(e) = backend.remove(key) {
                warn!("Error clearing cache entry {}: {}", key, e);
            }
        }
    }
}
