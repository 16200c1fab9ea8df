//! Cache-first artifact loaders (images and data frames)
//!
//! Both loaders follow the same algorithm:
//!
//! 1. Look up the cache key in the cache location. The key is the file
//!    name unless the caller scopes it (per-experiment loads prefix it with
//!    the experiment folder).
//! 2. Hit: decode the cached bytes and return them. The source is never
//!    touched.
//! 3. Miss: read the source once, decode, write the bytes through to the
//!    cache under the key, return the artifact.
//!
//! File names and keys must stay below their roots; absolute paths and
//! `..` segments fail with [`crate::Error::InvalidPath`].
//!
//! The cache is never re-validated against the source. Concurrent misses
//! on the same key may both read the source and both write the cache (last
//! writer wins) unless the loader was built `with_key_locking()`, which
//! serializes the whole lookup per cache path through [`CacheLocks`].

mod data_frame_loader;
mod image_loader;

pub use self::data_frame_loader::{CacheDataFrameLoader, DataFrame, DataFrameLoader};
pub use self::image_loader::{CacheImageLoader, ImageLoader, ImageSize};

use std::hash::{Hash, Hasher};
use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use tracing::debug;

use crate::location::{check_relative, LocationConfig};
use crate::Result;

/// Environment variable overriding the image cache root.
pub const IMAGE_CACHE_ENV: &str = "IMAGE_CACHE_PATH";
/// Image cache root used when [`IMAGE_CACHE_ENV`] is unset.
pub const DEFAULT_IMAGE_CACHE: &str = "./image_cache";
/// Environment variable overriding the data-frame cache root.
pub const DATA_FRAME_CACHE_ENV: &str = "DATAFRAME_CACHE_PATH";
/// Data-frame cache root used when [`DATA_FRAME_CACHE_ENV`] is unset.
pub const DEFAULT_DATA_FRAME_CACHE: &str = "./dataframe_cache";

/// Cache location from an environment variable, or `default` if unset.
#[must_use]
pub fn cache_location_from_env(var: &str, default: &str) -> LocationConfig {
    LocationConfig::new(std::env::var(var).unwrap_or_else(|_| default.to_string()))
}

/// Striped mutexes keyed by cache path.
///
/// Two keys may share a stripe; that only costs parallelism, never
/// correctness.
#[derive(Debug)]
pub struct CacheLocks {
    stripes: Vec<Mutex<()>>,
}

impl CacheLocks {
    /// Stripe count used by `with_key_locking()`.
    pub const DEFAULT_STRIPES: usize = 64;

    /// Create `stripes` locks (at least one).
    #[must_use]
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Number of stripes.
    #[must_use]
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Block until the stripe owning `key` is free.
    pub fn lock(&self, key: &Path) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(key)].lock()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn stripe_of(&self, key: &Path) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

impl Default for CacheLocks {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}

/// Shared cache-first lookup used by both loaders.
///
/// `file_name` is read from `source`; `cache_key` names the entry in
/// `cache`. Bytes are only written to the cache after they decoded
/// successfully.
pub(crate) fn load_cache_first<T>(
    cache: &LocationConfig,
    source: &LocationConfig,
    file_name: &str,
    cache_key: &str,
    locks: Option<&CacheLocks>,
    decode: impl Fn(&[u8]) -> Result<T>,
) -> Result<T> {
    check_relative(Path::new(file_name))?;
    let cache_location = cache.open()?;
    let cache_path = cache_location.join([cache_key])?;
    let _guard = locks.map(|locks| locks.lock(&cache_path));

    if cache_location.exists(cache_key)? {
        debug!(path = %cache_path.display(), "cache hit");
        let bytes = cache_location.read(cache_key)?;
        return decode(&bytes);
    }

    debug!(path = %cache_path.display(), source = %source.uri, "cache miss");
    let source_location = source.open()?;
    let bytes = source_location.read(file_name)?;
    let artifact = decode(&bytes)?;
    cache_location.write(cache_key, &bytes)?;
    Ok(artifact)
}
