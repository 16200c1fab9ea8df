//! Experiments: records, discovery and filtering
//!
//! ## Overview
//!
//! ```text
//! LocationConfig ──> FilesAndFolderLoader ──> ExperimentManager ──> filter_by
//!                          │
//!                          ├── CacheImageLoader      (per-experiment images)
//!                          └── CacheDataFrameLoader  (per-experiment tables)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use expdash::experiment::{
//!     random_experiments, ExperimentManager, ExperimentType, FilterCriteria,
//! };
//!
//! let manager = ExperimentManager::new(random_experiments(20, Some(42)));
//!
//! let segmentation = manager.filter_by(
//!     &FilterCriteria::new().and("experiment_type", ExperimentType::SemSeg),
//! );
//! assert!(segmentation
//!     .iter()
//!     .all(|e| e.experiment_type() == ExperimentType::SemSeg));
//! ```

mod discovery;
mod filter;
mod generator;
mod kind;
mod manager;
mod record;

pub use discovery::{
    experiment_folder_name, experiment_folder_name_at, write_experiment_folder,
    write_experiment_folder_at, ExperimentInfo, ExperimentLoader, FilesAndFolderLoader,
    EXP_INFO_FILE, GIT_VERSIONS_FILE,
};
pub use filter::{AttributeValue, FilterCriteria, FilterPolicy, FilterValue};
pub use generator::random_experiments;
pub use kind::{ExperimentType, ExperimentTypeInfo};
pub use manager::ExperimentManager;
pub use record::{format_label, Align, ColumnSpec, Experiment, ExperimentBuilder};
