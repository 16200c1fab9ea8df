//! # expdash: Experiment Dashboard Core
//!
//! **Version**: 0.1.0
//!
//! expdash discovers machine-learning training runs stored as folders of
//! YAML metadata, keeps them as an in-memory snapshot and answers
//! conjunctive attribute filters over it. Images and data frames produced
//! by runs are loaded through cache-first loaders.
//!
//! ## Design Principles
//!
//! - **Fail fast**: unknown experiment types and unreachable locations are
//!   errors, never silently skipped
//! - **Read-only snapshot**: the manager never mutates after discovery
//! - **Write-through cache**: a cached artifact is never refetched
//!
//! ## Example Usage
//!
//! ```rust
//! use expdash::experiment::{
//!     write_experiment_folder, ExperimentManager, ExperimentType, Experiment, FilterCriteria,
//! };
//! use expdash::location::LocationConfig;
//! use expdash::{CacheDataFrameLoader, CacheImageLoader, FilesAndFolderLoader};
//!
//! let root = LocationConfig::new("memory://lib-doc/experiments");
//! let experiment = Experiment::builder(ExperimentType::Cls, "run-1")
//!     .name("Baseline")
//!     .short_id("aB3d")
//!     .build();
//! write_experiment_folder(&root.open()?, "", &experiment)?;
//!
//! let loader = FilesAndFolderLoader::new(
//!     root,
//!     CacheImageLoader::new(LocationConfig::new("memory://lib-doc/image_cache")),
//!     CacheDataFrameLoader::new(LocationConfig::new("memory://lib-doc/df_cache")),
//! );
//! let manager = ExperimentManager::discover(&loader, None)?;
//! let found = manager.filter_by(&FilterCriteria::new().and("name", "Baseline"));
//! assert_eq!(found.len(), 1);
//! # Ok::<(), expdash::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod loader;
pub mod location;
pub mod logging;

pub use config::DashboardConfig;
pub use error::{Error, Result};
pub use experiment::{
    Experiment, ExperimentLoader, ExperimentManager, ExperimentType, FilesAndFolderLoader,
    FilterCriteria, FilterValue,
};
pub use loader::{CacheDataFrameLoader, CacheImageLoader, DataFrameLoader, ImageLoader};
pub use location::LocationConfig;
