// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Artifact cache backed by a content-addressed disk store (cacache).
//!
//! An artifact is valid only for the key it was written under, and the key
//! carries a digest of the inputs plus every parameter that affects the
//! result. Writes go through cacache, which writes content to a temporary
//! file and moves it into place, so readers never see a partial artifact.
//! A per-key lock makes concurrent `get_or_compute` calls compute once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use microclimate_core::{PointCloud, SurfaceMesh};
use rustc_hash::FxHashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Bumped whenever the serialized layout of an artifact changes.
pub const FORMAT_VERSION: u32 = 1;

/// Kind of persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Classification,
    GroundFilter,
    AirLayer,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Classification => "classification",
            ArtifactKind::GroundFilter => "ground-filter",
            ArtifactKind::AirLayer => "air-layer",
        }
    }
}

/// Composite cache key: artifact kind, parameters and input digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub kind: ArtifactKind,
    /// Parameter name to rendered value, ordered by name
    pub params: BTreeMap<String, String>,
    /// SHA-256 hex digest of the inputs
    pub input_digest: String,
}

impl ArtifactKey {
    pub fn new(kind: ArtifactKind, input_digest: impl Into<String>) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
            input_digest: input_digest.into(),
        }
    }

    /// Add a parameter, rendered with `{:?}`.
    pub fn with_param(mut self, name: impl Into<String>, value: impl fmt::Debug) -> Self {
        self.params.insert(name.into(), format!("{:?}", value));
        self
    }

    /// Key string inside the store.
    pub fn storage_key(&self, namespace: &str) -> String {
        let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!(
            "{namespace}:v{FORMAT_VERSION}:{}:{}:{}",
            self.kind.as_str(),
            self.input_digest,
            params.join(";")
        )
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.input_digest.chars().take(12).collect();
        write!(f, "{}({})", self.kind.as_str(), short)
    }
}

/// Incremental SHA-256 over pipeline inputs.
#[derive(Clone, Default)]
pub struct InputDigest {
    hasher: Sha256,
}

impl InputDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_str(&mut self, value: &str) -> &mut Self {
        self.hasher.update((value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    pub fn update_f64(&mut self, value: f64) -> &mut Self {
        self.hasher.update(value.to_bits().to_le_bytes());
        self
    }

    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.hasher.update(value.to_le_bytes());
        self
    }

    /// Name, CRS and every vertex of every facet.
    pub fn update_mesh(&mut self, mesh: &SurfaceMesh) -> &mut Self {
        self.update_str("mesh").update_str(&mesh.name);
        self.update_str(mesh.crs.as_deref().unwrap_or(""));
        self.update_u64(mesh.facets.len() as u64);
        for facet in &mesh.facets {
            self.update_u64(facet.id as u64);
            self.update_u64(facet.vertices.len() as u64);
            for v in &facet.vertices {
                self.update_f64(v[0]).update_f64(v[1]).update_f64(v[2]);
            }
        }
        self
    }

    /// Domain, CRS and every point with its `cell_ID`.
    pub fn update_points(&mut self, cloud: &PointCloud) -> &mut Self {
        self.update_str("points").update_str(cloud.domain.as_str());
        self.update_str(cloud.crs.as_deref().unwrap_or(""));
        self.update_u64(cloud.points.len() as u64);
        for p in &cloud.points {
            self.update_u64(u64::from(p.cell_id));
            self.update_f64(p.x).update_f64(p.y).update_f64(p.z);
        }
        self
    }

    /// Hex digest.
    pub fn finish(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    pub fn of_mesh(mesh: &SurfaceMesh) -> String {
        Self::new().update_mesh(mesh).finish()
    }

    pub fn of_points(cloud: &PointCloud) -> String {
        Self::new().update_points(cloud).finish()
    }
}

/// Counters since the cache was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// Disk-backed artifact cache.
#[derive(Debug)]
pub struct ArtifactCache {
    root: PathBuf,
    namespace: String,
    locks: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl ArtifactCache {
    /// Open (and create if needed) the cache described by `config`.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root)?;
        tracing::debug!(root = %config.root.display(), namespace = %config.namespace, "Opened artifact cache");
        Ok(Self {
            root: config.root.clone(),
            namespace: config.namespace.clone(),
            locks: Mutex::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get a stored artifact by key.
    pub fn get<T: DeserializeOwned>(&self, key: &ArtifactKey) -> Result<Option<T>> {
        let storage_key = key.storage_key(&self.namespace);
        match cacache::read_sync(&self.root, &storage_key) {
            Ok(data) => {
                let value: T = serde_json::from_slice(&data)?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, size = data.len(), "Cache hit");
                Ok(Some(value))
            }
            Err(cacache::Error::EntryNotFound(_, _)) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache miss");
                Ok(None)
            }
            Err(e) => Err(Error::CacheIo(e.to_string())),
        }
    }

    /// Store an artifact under key, replacing any previous one.
    pub fn put<T: Serialize>(&self, key: &ArtifactKey, value: &T) -> Result<()> {
        let storage_key = key.storage_key(&self.namespace);
        let data = serde_json::to_vec(value)?;
        cacache::write_sync(&self.root, &storage_key, &data)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, size = data.len(), "Cached artifact");
        Ok(())
    }

    /// Return the artifact for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once per key while the entry exists; callers
    /// racing on the same key wait for the first one and then read its result.
    pub fn get_or_compute<T, F>(&self, key: &ArtifactKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        self.with_key_lock(key, || -> Result<T> {
            if let Some(value) = self.get(key)? {
                return Ok(value);
            }

            let value = compute()?;
            self.put(key, &value)?;
            Ok(value)
        })
    }

    /// Drop the entry for `key`. Absent entries are not an error.
    pub fn invalidate(&self, key: &ArtifactKey) -> Result<()> {
        self.with_key_lock(key, || -> Result<()> {
            cacache::remove_sync(&self.root, key.storage_key(&self.namespace))?;
            tracing::debug!(key = %key, "Invalidated artifact");
            Ok(())
        })
    }

    /// Remove every entry in the store.
    pub fn clear(&self) -> Result<()> {
        cacache::clear_sync(&self.root)?;
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        tracing::info!(root = %self.root.display(), "Cleared artifact cache");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    /// Run `f` holding the lock of `key`.
    ///
    /// The lock entry is dropped again once no other caller holds or waits
    /// on it, so the table only tracks keys in use.
    fn with_key_lock<R>(&self, key: &ArtifactKey, f: impl FnOnce() -> R) -> R {
        let storage_key = key.storage_key(&self.namespace);
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(storage_key.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&storage_key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&storage_key);
        }
        result
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
