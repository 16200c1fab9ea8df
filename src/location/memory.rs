//! In-process object store backend using `DashMap`.
//!
//! Behaves like a remote object store: keys are flat, directories only
//! exist as key prefixes. Buckets are shared by name within the process
//! and their content is lost on restart.

use std::collections::BTreeSet;
use std::path::{Component, Path};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::FileSystem;
use crate::{Error, Result};

static BUCKETS: OnceLock<DashMap<String, Arc<MemoryFileSystem>>> = OnceLock::new();

/// In-memory object store bucket.
///
/// Thread-safe; uses `DashMap` internally for O(1) average-case lookups.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    objects: DashMap<String, Vec<u8>>,
    reads: AtomicUsize,
}

impl MemoryFileSystem {
    /// Create a standalone bucket (not registered by name).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the process-wide bucket called `name`.
    ///
    /// This is what `memory://<name>/...` locations resolve to.
    #[must_use]
    pub fn bucket(name: &str) -> Arc<Self> {
        BUCKETS
            .get_or_init(DashMap::new)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Self::new()))
            .clone()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the bucket holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of `read` calls served so far, hits and misses alike.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Remove a single object. No-op if it doesn't exist.
    pub fn remove(&self, path: &Path) {
        self.objects.remove(&object_key(path));
    }

    /// Remove all objects.
    pub fn clear(&self) {
        self.objects.clear();
    }

    fn has_children(&self, key: &str) -> bool {
        if key.is_empty() {
            return !self.objects.is_empty();
        }
        let prefix = format!("{key}/");
        self.objects.iter().any(|entry| entry.key().starts_with(&prefix))
    }
}

/// Normalize a path into a flat object key (`a/b/c`).
fn object_key(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl FileSystem for MemoryFileSystem {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let key = object_key(path);
        Ok(self.objects.contains_key(&key) || self.has_children(&key))
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self.has_children(&object_key(path)))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let key = object_key(path);
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };

        let names: BTreeSet<String> = self
            .objects
            .iter()
            .filter_map(|entry| {
                entry
                    .key()
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.split('/').next())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .collect();

        if names.is_empty() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(names.into_iter().collect())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.objects
            .get(&object_key(path))
            .map(|v| v.value().clone())
            .ok_or_else(|| Error::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.objects.insert(object_key(path), data.to_vec());
        Ok(())
    }
}
