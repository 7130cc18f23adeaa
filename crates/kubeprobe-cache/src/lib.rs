//! File-backed result cache for kubeprobe
//!
//! Each (config, resource) pair caches the last API response as a JSON file.
//! Freshness is decided by the file's modification time alone; the document
//! carries no expiry field of its own.

use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use atomicwrites::{AllowOverwrite, AtomicFile};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use kubeprobe_types::{CacheKey, ProbeError};

/// Cache directory used when none is configured
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// TTL-gated JSON cache stored as one file per key
#[derive(Clone, Debug)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Path of the cache file for a key
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Last modification time of the entry, if it exists
    pub fn modified_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.path_for(key)).ok()?.modified().ok()?;
        Some(modified.into())
    }

    /// Age of the entry. An mtime in the future counts as age zero.
    pub fn age(&self, key: &CacheKey) -> Option<Duration> {
        let modified = fs::metadata(self.path_for(key)).ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default(),
        )
    }

    /// Check whether the entry exists and is within the TTL
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.age(key).is_some_and(|age| age <= self.ttl)
    }

    /// Read a fresh entry
    ///
    /// Returns `Ok(None)` when the entry is missing or stale, and
    /// `CacheRead` when the file exists but cannot be read or parsed.
    pub fn read(&self, key: &CacheKey) -> Result<Option<Value>, ProbeError> {
        if !self.is_fresh(key) {
            return Ok(None);
        }

        let bytes = fs::read(self.path_for(key)).map_err(|e| ProbeError::CacheRead {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let value = serde_json::from_slice(&bytes).map_err(|e| ProbeError::CacheRead {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(value))
    }

    /// Replace the entry with `value`
    ///
    /// The document is written to a temporary file and renamed into place, so
    /// readers see either the old or the new content.
    pub fn write(&self, key: &CacheKey, value: &Value) -> Result<(), ProbeError> {
        let write_err = |reason: String| ProbeError::CacheWrite {
            key: key.clone(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|e| write_err(e.to_string()))?;
        let bytes = serde_json::to_vec(value).map_err(|e| write_err(e.to_string()))?;

        AtomicFile::new(self.path_for(key), AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| write_err(e.to_string()))?;

        debug!(key = %key, bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    /// Return the cached value for `key`, calling `fetch` on a miss
    ///
    /// A stale, missing, or unreadable entry is a miss. Fresh data from
    /// `fetch` overwrites the entry before it is returned; a fetch error
    /// leaves the existing file untouched.
    pub async fn resolve<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Value, ProbeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ProbeError>>,
    {
        match self.read(key) {
            Ok(Some(value)) => {
                debug!(
                    key = %key,
                    modified = ?self.modified_at(key),
                    "cache hit"
                );
                return Ok(value);
            }
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(e) => warn!(error = %e, "ignoring unreadable cache entry"),
        }

        self.refresh(key, fetch).await
    }

    /// Fetch fresh data and overwrite the entry, ignoring its freshness
    pub async fn refresh<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Value, ProbeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ProbeError>>,
    {
        let value = fetch().await?;
        self.write(key, &value)?;
        info!(key = %key, "cache refreshed");
        Ok(value)
    }
}
