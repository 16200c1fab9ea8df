//! Cache-first image loader

use std::fmt;
use std::sync::Arc;

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::{cache_location_from_env, load_cache_first, CacheLocks};
use super::{DEFAULT_IMAGE_CACHE, IMAGE_CACHE_ENV};
use crate::location::LocationConfig;
use crate::Result;

/// Target pixel size for a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageSize {
    /// Create an image size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of an existing image.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Loads images from a location.
pub trait ImageLoader: Send + Sync {
    /// Load `file_name` from `image_location`, optionally resized to exactly
    /// `target_size`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the file is absent, or a decode error
    /// if the bytes are not an image.
    fn load_image(
        &self,
        image_location: &LocationConfig,
        file_name: &str,
        target_size: Option<ImageSize>,
    ) -> Result<DynamicImage> {
        self.load_image_cached_as(image_location, file_name, file_name, target_size)
    }

    /// Like [`ImageLoader::load_image`], caching under `cache_key` instead
    /// of the bare file name.
    ///
    /// # Errors
    ///
    /// Same as [`ImageLoader::load_image`].
    fn load_image_cached_as(
        &self,
        image_location: &LocationConfig,
        file_name: &str,
        cache_key: &str,
        target_size: Option<ImageSize>,
    ) -> Result<DynamicImage>;
}

/// Image loader with an on-disk (or in-memory) cache in front of the source.
///
/// The cache always stores the image at its original size; resizing only
/// applies to the returned value.
#[derive(Debug, Clone)]
pub struct CacheImageLoader {
    cache_location: LocationConfig,
    locks: Option<Arc<CacheLocks>>,
}

impl CacheImageLoader {
    /// Create a loader caching into `cache_location`.
    #[must_use]
    pub fn new(cache_location: LocationConfig) -> Self {
        Self {
            cache_location,
            locks: None,
        }
    }

    /// Create a loader caching into `$IMAGE_CACHE_PATH` or `./image_cache`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(cache_location_from_env(IMAGE_CACHE_ENV, DEFAULT_IMAGE_CACHE))
    }

    /// Serialize cache lookups per cache path.
    #[must_use]
    pub fn with_key_locking(mut self) -> Self {
        self.locks = Some(Arc::new(CacheLocks::default()));
        self
    }

    /// Cache location this loader writes to.
    #[must_use]
    pub const fn cache_location(&self) -> &LocationConfig {
        &self.cache_location
    }
}

impl Default for CacheImageLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ImageLoader for CacheImageLoader {
    fn load_image_cached_as(
        &self,
        image_location: &LocationConfig,
        file_name: &str,
        cache_key: &str,
        target_size: Option<ImageSize>,
    ) -> Result<DynamicImage> {
        let image = load_cache_first(
            &self.cache_location,
            image_location,
            file_name,
            cache_key,
            self.locks.as_deref(),
            |bytes| Ok(image::load_from_memory(bytes)?),
        )?;

        Ok(match target_size {
            Some(size) if size != ImageSize::of(&image) => {
                image.resize_exact(size.width, size.height, FilterType::Triangle)
            }
            _ => image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_display() {
        assert_eq!(ImageSize::new(1024, 768).to_string(), "1024x768");
    }

    #[test]
    fn test_image_size_of() {
        let image = DynamicImage::new_rgb8(12, 7);
        assert_eq!(ImageSize::of(&image), ImageSize::new(12, 7));
    }

    #[test]
    fn test_with_key_locking_is_shared_between_clones() {
        let loader =
            CacheImageLoader::new(LocationConfig::new("memory://img-lock")).with_key_locking();
        let clone = loader.clone();
        assert!(Arc::ptr_eq(
            loader.locks.as_ref().unwrap(),
            clone.locks.as_ref().unwrap()
        ));
    }
}
