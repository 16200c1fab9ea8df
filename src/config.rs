//! Dashboard configuration
//!
//! Locations come from a YAML file, from environment variables, or from
//! the built-in defaults, in that order of precedence.

use std::path::Path;

use serde::Deserialize;

use crate::experiment::FilesAndFolderLoader;
use crate::loader::{
    cache_location_from_env, CacheDataFrameLoader, CacheImageLoader, DATA_FRAME_CACHE_ENV,
    DEFAULT_DATA_FRAME_CACHE, DEFAULT_IMAGE_CACHE, IMAGE_CACHE_ENV,
};
use crate::location::LocationConfig;
use crate::{Error, Result};

/// Environment variable overriding the experiment root.
pub const EXPERIMENT_PATH_ENV: &str = "EXPERIMENT_PATH";
/// Experiment root used when [`EXPERIMENT_PATH_ENV`] is unset.
pub const DEFAULT_EXPERIMENT_PATH: &str = "./experiments";

/// Where experiments and artifact caches live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    /// Experiment root
    #[serde(default = "default_experiment_location")]
    pub experiment_location: LocationConfig,
    /// Image cache root
    #[serde(default = "default_image_cache_location")]
    pub image_cache_location: LocationConfig,
    /// Data-frame cache root
    #[serde(default = "default_data_frame_cache_location")]
    pub data_frame_cache_location: LocationConfig,
}

fn default_experiment_location() -> LocationConfig {
    cache_location_from_env(EXPERIMENT_PATH_ENV, DEFAULT_EXPERIMENT_PATH)
}

fn default_image_cache_location() -> LocationConfig {
    cache_location_from_env(IMAGE_CACHE_ENV, DEFAULT_IMAGE_CACHE)
}

fn default_data_frame_cache_location() -> LocationConfig {
    cache_location_from_env(DATA_FRAME_CACHE_ENV, DEFAULT_DATA_FRAME_CACHE)
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DashboardConfig {
    /// Read `EXPERIMENT_PATH`, `IMAGE_CACHE_PATH` and `DATAFRAME_CACHE_PATH`,
    /// falling back to relative default directories.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            experiment_location: default_experiment_location(),
            image_cache_location: default_image_cache_location(),
            data_frame_cache_location: default_data_frame_cache_location(),
        }
    }

    /// Parse YAML; missing sections fall back to [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| Error::Metadata {
            path: "<inline>".into(),
            source,
        })
    }

    /// Read and parse a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`Error::Metadata`] if it is malformed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| crate::location::map_io(path, e))?;
        serde_yaml::from_str(&content).map_err(|source| Error::Metadata {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Discovery loader wired with the configured caches.
    #[must_use]
    pub fn build_loader(&self) -> FilesAndFolderLoader {
        FilesAndFolderLoader::new(
            self.experiment_location.clone(),
            CacheImageLoader::new(self.image_cache_location.clone()),
            CacheDataFrameLoader::new(self.data_frame_cache_location.clone()),
        )
    }
}
