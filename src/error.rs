//! Error types for expdash
//!
//! Only conditions with an obvious safe default are recovered where they
//! occur (missing discovery root, incomparable filter values). Everything
//! else reaches the caller through this enum.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// expdash error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment-type prefix has no matching variant
    #[error("Experiment type not found for prefix '{prefix}'")]
    ExperimentTypeNotFound {
        /// Prefix read from the experiment metadata
        prefix: String,
    },

    /// Filter value cannot be compared with the attribute value
    #[error(
        "Incomparable types for attribute '{attribute}': \
         attribute is {actual}, filter value is {expected}"
    )]
    FilterTypeMismatch {
        /// Attribute name used in the filter
        attribute: String,
        /// Kind of the supplied filter value
        expected: &'static str,
        /// Kind of the attribute value on the experiment
        actual: &'static str,
    },

    /// Filter names an attribute that experiments do not have
    #[error("Unknown experiment attribute '{0}'")]
    UnknownAttribute(String),

    /// File absent from the location (and from the cache, for artifacts)
    #[error("Not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Location URI is malformed or its backend is unavailable
    #[error("Location unreachable: {uri}: {reason}")]
    LocationUnreachable {
        /// URI as configured
        uri: String,
        /// What went wrong
        reason: String,
    },

    /// Relative path would leave its location root
    #[error("Invalid path {}: must stay below the location root", path.display())]
    InvalidPath {
        /// Offending path as given
        path: PathBuf,
    },

    /// Destination already exists and will not be overwritten
    #[error("Already exists: {}", path.display())]
    AlreadyExists {
        /// Existing path
        path: PathBuf,
    },

    /// Experiment metadata file could not be parsed
    #[error("Malformed experiment metadata in {}: {source}", path.display())]
    Metadata {
        /// Metadata file path
        path: PathBuf,
        /// YAML parse error
        source: serde_yaml::Error,
    },

    /// Storage error (table shape, schema mismatch)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means "the thing does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::NotFound {
            path: PathBuf::from("a/b.png"),
        };
        assert!(err.is_not_found());

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_not_found());

        let other = Error::UnknownAttribute("color".to_string());
        assert!(!other.is_not_found());
    }
}
