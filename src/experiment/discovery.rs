//! Experiment discovery from files and folders
//!
//! Each experiment lives in its own folder below the experiment root
//! (optionally below a data-set sub-path):
//!
//! ```text
//! <root>/[<data_set>/]<PREFIX>-<timestamp>-id_<short_id>/
//!     experiment_info.yaml   EXP_NAME, DESCRIPTION, RUN_ID, SHORT_ID, EXP_TYPE
//!     git_versions.yaml      component: version
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Experiment, ExperimentType};
use crate::loader::{DataFrame, DataFrameLoader, ImageLoader, ImageSize};
use crate::location::{LocationConfig, OpenLocation};
use crate::{Error, Result};

/// Experiment info file inside each experiment folder.
pub const EXP_INFO_FILE: &str = "experiment_info.yaml";
/// Git versions file inside each experiment folder.
pub const GIT_VERSIONS_FILE: &str = "git_versions.yaml";

/// Contents of the experiment info file.
///
/// Upper-case keys are written; lower-case aliases are accepted on read.
/// Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    /// Human label
    #[serde(rename = "EXP_NAME", alias = "name")]
    pub name: String,
    /// Short identifier
    #[serde(rename = "SHORT_ID", alias = "short_id")]
    pub short_id: String,
    /// Description
    #[serde(rename = "DESCRIPTION", alias = "description", default)]
    pub description: String,
    /// Full run identifier
    #[serde(rename = "RUN_ID", alias = "run_id")]
    pub run_id: String,
    /// Experiment-type prefix
    #[serde(rename = "EXP_TYPE", alias = "prefix", alias = "experiment_type")]
    pub prefix: String,
    /// Data set label
    #[serde(
        rename = "DATA_SET",
        alias = "data_set",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_set: Option<String>,
}

impl ExperimentInfo {
    /// Build the experiment record.
    ///
    /// `fallback_data_set` is used when the info file names no data set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentTypeNotFound`] for an unknown prefix.
    pub fn into_experiment(
        self,
        git_version: BTreeMap<String, String>,
        fallback_data_set: Option<&str>,
    ) -> Result<Experiment> {
        let experiment_type = ExperimentType::from_prefix(&self.prefix)?;
        let data_set = self
            .data_set
            .or_else(|| fallback_data_set.map(str::to_string))
            .unwrap_or_default();

        Ok(Experiment::builder(experiment_type, self.run_id)
            .name(self.name)
            .description(self.description)
            .short_id(self.short_id)
            .git_version(git_version)
            .data_set(data_set)
            .build())
    }
}

impl From<&Experiment> for ExperimentInfo {
    fn from(experiment: &Experiment) -> Self {
        Self {
            name: experiment.name().to_string(),
            short_id: experiment.short_id().to_string(),
            description: experiment.description().to_string(),
            run_id: experiment.experiment_id().to_string(),
            prefix: experiment.experiment_type().prefix().to_string(),
            data_set: Some(experiment.data_set().to_string()).filter(|d| !d.is_empty()),
        }
    }
}

/// Discovers experiments and loads their artifacts.
pub trait ExperimentLoader: Send + Sync {
    /// Discover experiments below the root, or below `data_set` when given.
    ///
    /// A missing root yields an empty list. Order is the listing order of
    /// the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentTypeNotFound`] for an unknown type
    /// prefix, and location or metadata errors.
    fn load_experiments(&self, data_set: Option<&str>) -> Result<Vec<Experiment>>;

    /// Image loader artifacts go through.
    fn image_loader(&self) -> &dyn ImageLoader;

    /// Data-frame loader artifacts go through.
    fn data_frame_loader(&self) -> &dyn DataFrameLoader;

    /// Experiment root location.
    fn root_location(&self) -> &LocationConfig;

    /// Folder of `experiment`, relative to the root.
    fn experiment_folder(&self, experiment: &Experiment) -> String;

    /// Location of one experiment's folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the folder leaves the root.
    fn experiment_location(&self, experiment: &Experiment) -> Result<LocationConfig> {
        self.root_location().join(&self.experiment_folder(experiment))
    }

    /// Load an image from an arbitrary location.
    ///
    /// # Errors
    ///
    /// See [`ImageLoader::load_image`].
    fn load_image(
        &self,
        image_location: &LocationConfig,
        file_name: &str,
        target_size: Option<ImageSize>,
    ) -> Result<DynamicImage> {
        self.image_loader()
            .load_image(image_location, file_name, target_size)
    }

    /// Load a data frame from an arbitrary location.
    ///
    /// # Errors
    ///
    /// See [`DataFrameLoader::load_data_frame`].
    fn load_data_frame(
        &self,
        data_frame_location: &LocationConfig,
        file_name: &str,
    ) -> Result<DataFrame> {
        self.data_frame_loader()
            .load_data_frame(data_frame_location, file_name)
    }

    /// Load an image relative to `experiment`'s folder.
    ///
    /// The cache entry is `<folder>/<file_name>`, so experiments sharing a
    /// file name never share a cached artifact.
    ///
    /// # Errors
    ///
    /// See [`ImageLoader::load_image`].
    fn load_experiment_image(
        &self,
        experiment: &Experiment,
        file_name: &str,
        target_size: Option<ImageSize>,
    ) -> Result<DynamicImage> {
        let folder = self.experiment_folder(experiment);
        let location = self.root_location().join(&folder)?;
        self.image_loader().load_image_cached_as(
            &location,
            file_name,
            &experiment_cache_key(&folder, file_name),
            target_size,
        )
    }

    /// Load a data frame relative to `experiment`'s folder.
    ///
    /// Cached under `<folder>/<file_name>` like
    /// [`ExperimentLoader::load_experiment_image`].
    ///
    /// # Errors
    ///
    /// See [`DataFrameLoader::load_data_frame`].
    fn load_experiment_data_frame(
        &self,
        experiment: &Experiment,
        file_name: &str,
    ) -> Result<DataFrame> {
        let folder = self.experiment_folder(experiment);
        let location = self.root_location().join(&folder)?;
        self.data_frame_loader().load_data_frame_cached_as(
            &location,
            file_name,
            &experiment_cache_key(&folder, file_name),
        )
    }
}

fn experiment_cache_key(folder: &str, file_name: &str) -> String {
    format!("{}/{file_name}", folder.trim_end_matches('/'))
}

/// Discovers experiments from one folder per experiment.
///
/// Remembers which folder each `experiment_id` came from in the latest
/// successful scan, so artifact loads resolve to that folder. Experiments
/// the latest scan did not see resolve to `<root>/<experiment_id>`.
pub struct FilesAndFolderLoader {
    experiment_location: LocationConfig,
    image_loader: Arc<dyn ImageLoader>,
    data_frame_loader: Arc<dyn DataFrameLoader>,
    folders: RwLock<FxHashMap<String, String>>,
}

impl FilesAndFolderLoader {
    /// Create a loader over `experiment_location`.
    #[must_use]
    pub fn new(
        experiment_location: LocationConfig,
        image_loader: impl ImageLoader + 'static,
        data_frame_loader: impl DataFrameLoader + 'static,
    ) -> Self {
        Self::with_shared_loaders(
            experiment_location,
            Arc::new(image_loader),
            Arc::new(data_frame_loader),
        )
    }

    /// Create a loader sharing artifact loaders with other components.
    #[must_use]
    pub fn with_shared_loaders(
        experiment_location: LocationConfig,
        image_loader: Arc<dyn ImageLoader>,
        data_frame_loader: Arc<dyn DataFrameLoader>,
    ) -> Self {
        Self {
            experiment_location,
            image_loader,
            data_frame_loader,
            folders: RwLock::new(FxHashMap::default()),
        }
    }

    fn read_experiment(
        location: &OpenLocation,
        folder: &Path,
        data_set: Option<&str>,
    ) -> Result<Experiment> {
        let info: ExperimentInfo = read_yaml(location, &folder.join(EXP_INFO_FILE))?;

        let git_path = folder.join(GIT_VERSIONS_FILE);
        let git_version = match read_yaml::<Option<BTreeMap<String, String>>>(location, &git_path)
        {
            Ok(versions) => versions.unwrap_or_default(),
            Err(err) if err.is_not_found() => {
                debug!(path = %git_path.display(), "no git versions recorded");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };

        info.into_experiment(git_version, data_set)
    }
}

impl fmt::Debug for FilesAndFolderLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesAndFolderLoader")
            .field("experiment_location", &self.experiment_location)
            .field("known_folders", &self.folders.read().len())
            .finish_non_exhaustive()
    }
}

impl ExperimentLoader for FilesAndFolderLoader {
    fn load_experiments(&self, data_set: Option<&str>) -> Result<Vec<Experiment>> {
        let scope = PathBuf::from(data_set.unwrap_or_default());
        let location = self.experiment_location.open()?;

        let entries = match location.list_dir(&scope) {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => {
                warn!(
                    path = %location.root().join(&scope).display(),
                    "experiment root not found, no experiments discovered"
                );
                self.folders.write().clear();
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut experiments = Vec::new();
        let mut folders = FxHashMap::default();
        for entry in entries {
            let folder = scope.join(&entry);
            if !location.is_dir(&folder)? {
                continue;
            }
            let experiment = Self::read_experiment(&location, &folder, data_set)?;
            folders.insert(
                experiment.experiment_id().to_string(),
                folder.to_string_lossy().into_owned(),
            );
            experiments.push(experiment);
        }
        *self.folders.write() = folders;

        info!(
            root = %self.experiment_location.uri,
            data_set = data_set.unwrap_or_default(),
            count = experiments.len(),
            "experiments discovered"
        );
        Ok(experiments)
    }

    fn image_loader(&self) -> &dyn ImageLoader {
        self.image_loader.as_ref()
    }

    fn data_frame_loader(&self) -> &dyn DataFrameLoader {
        self.data_frame_loader.as_ref()
    }

    fn root_location(&self) -> &LocationConfig {
        &self.experiment_location
    }

    fn experiment_folder(&self, experiment: &Experiment) -> String {
        self.folders
            .read()
            .get(experiment.experiment_id())
            .cloned()
            .unwrap_or_else(|| experiment.experiment_id().to_string())
    }
}

fn read_yaml<T: DeserializeOwned>(location: &OpenLocation, relative: &Path) -> Result<T> {
    let bytes = location.read(relative)?;
    serde_yaml::from_slice(&bytes).map_err(|source| Error::Metadata {
        path: location.root().join(relative),
        source,
    })
}

/// Folder name for `experiment` created now:
/// `<PREFIX>-<timestamp>-id_<short_id>`.
#[must_use]
pub fn experiment_folder_name(experiment: &Experiment) -> String {
    experiment_folder_name_at(experiment, Utc::now())
}

/// Folder name for `experiment` created at `created_at`.
#[must_use]
pub fn experiment_folder_name_at(experiment: &Experiment, created_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-id_{}",
        experiment.experiment_type().prefix(),
        created_at.format("%Y-%m-%dT%H.%M.%S.%3fZ"),
        experiment.short_id()
    )
}

/// Write `experiment` as a discoverable folder below `parent`, stamped
/// with the current time.
///
/// The info file is YAML, the git versions file is JSON (read back as YAML).
/// Returns the folder path relative to the location root.
///
/// # Errors
///
/// Returns [`Error::AlreadyExists`] if the folder is taken, and
/// serialization or backend write errors.
pub fn write_experiment_folder(
    location: &OpenLocation,
    parent: &str,
    experiment: &Experiment,
) -> Result<PathBuf> {
    write_experiment_folder_at(location, parent, experiment, Utc::now())
}

/// Write `experiment` as a folder stamped with `created_at`.
///
/// Two experiments of one type sharing a short id and a millisecond map to
/// the same folder; the second write fails and the first folder is kept.
///
/// # Errors
///
/// Returns [`Error::AlreadyExists`] if the folder is taken, and
/// serialization or backend write errors.
pub fn write_experiment_folder_at(
    location: &OpenLocation,
    parent: &str,
    experiment: &Experiment,
    created_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let folder = Path::new(parent).join(experiment_folder_name_at(experiment, created_at));
    if location.exists(&folder)? {
        return Err(Error::AlreadyExists {
            path: location.root().join(&folder),
        });
    }

    let info = serde_yaml::to_string(&ExperimentInfo::from(experiment)).map_err(|source| {
        Error::Metadata {
            path: location.root().join(folder.join(EXP_INFO_FILE)),
            source,
        }
    })?;
    location.write(folder.join(EXP_INFO_FILE), info.as_bytes())?;

    let versions = serde_json::to_vec_pretty(experiment.git_version())?;
    location.write(folder.join(GIT_VERSIONS_FILE), &versions)?;

    debug!(folder = %folder.display(), "experiment folder written");
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_accepts_upper_case_keys() {
        let yaml = "EXP_NAME: Run1\nSHORT_ID: AB1\nDESCRIPTION: d\nRUN_ID: abc-123\n\
                    EXP_TYPE: SEG\nENVIRONMENT: {}\n";
        let info: ExperimentInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(info.name, "Run1");
        assert_eq!(info.prefix, "SEG");
        assert!(info.data_set.is_none());
    }

    #[test]
    fn test_info_accepts_lower_case_aliases() {
        let yaml = "name: Run1\nrun_id: abc-123\nshort_id: AB1\nprefix: SEG\n";
        let info: ExperimentInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(info.run_id, "abc-123");
        assert_eq!(info.description, "");
    }

    #[test]
    fn test_into_experiment_unknown_prefix() {
        let info = ExperimentInfo {
            name: "Run1".to_string(),
            short_id: "AB1".to_string(),
            description: String::new(),
            run_id: "abc-123".to_string(),
            prefix: "XYZ".to_string(),
            data_set: None,
        };
        assert!(matches!(
            info.into_experiment(BTreeMap::new(), None).unwrap_err(),
            Error::ExperimentTypeNotFound { .. }
        ));
    }

    #[test]
    fn test_into_experiment_data_set_fallback() {
        let mut info = ExperimentInfo {
            name: "Run1".to_string(),
            short_id: "AB1".to_string(),
            description: String::new(),
            run_id: "abc-123".to_string(),
            prefix: "CLS".to_string(),
            data_set: None,
        };
        let experiment = info.clone().into_experiment(BTreeMap::new(), Some("scope")).unwrap();
        assert_eq!(experiment.data_set(), "scope");

        info.data_set = Some("own".to_string());
        let experiment = info.into_experiment(BTreeMap::new(), Some("scope")).unwrap();
        assert_eq!(experiment.data_set(), "own");
    }

    #[test]
    fn test_folder_name_shape() {
        let experiment = Experiment::builder(ExperimentType::ObjDet, "id-1")
            .short_id("Zx9q")
            .build();
        let name = experiment_folder_name(&experiment);
        assert!(name.starts_with("OBD-"));
        assert!(name.ends_with("-id_Zx9q"));
    }

    #[test]
    fn test_folder_name_at_fixed_time() {
        let experiment = Experiment::builder(ExperimentType::Cls, "id-2")
            .short_id("AB1")
            .build();
        let created_at = DateTime::parse_from_rfc3339("2024-03-05T07:08:09.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            experiment_folder_name_at(&experiment, created_at),
            "CLS-2024-03-05T07.08.09.123Z-id_AB1"
        );
    }

    #[test]
    fn test_cache_key_joins_folder_and_file() {
        assert_eq!(experiment_cache_key("SEG-a", "mask.png"), "SEG-a/mask.png");
        assert_eq!(experiment_cache_key("city/SEG-a/", "m.parquet"), "city/SEG-a/m.parquet");
    }
}
