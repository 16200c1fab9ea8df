//! Experiment Type - closed set of experiment kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Display data attached to each experiment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExperimentTypeInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Stable on-disk identifier
    pub prefix: &'static str,
    /// UI icon identifier
    pub icon: &'static str,
}

/// Kind of experiment.
///
/// The prefix is the stable on-disk and wire identifier; `serde` reads and
/// writes the prefix only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExperimentType {
    /// Semantic segmentation (`SEG`)
    SemSeg,
    /// Object detection (`OBD`)
    ObjDet,
    /// Image classification (`CLS`)
    Cls,
}

impl ExperimentType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::SemSeg, Self::ObjDet, Self::Cls];

    /// Name, prefix and icon for this type.
    #[must_use]
    pub const fn info(self) -> ExperimentTypeInfo {
        match self {
            Self::SemSeg => ExperimentTypeInfo {
                name: "Semantic Segmentation",
                prefix: "SEG",
                icon: "o_apps",
            },
            Self::ObjDet => ExperimentTypeInfo {
                name: "Object Detection",
                prefix: "OBD",
                icon: "o_filter_center_focus",
            },
            Self::Cls => ExperimentTypeInfo {
                name: "Image Classification",
                prefix: "CLS",
                icon: "o_image_search",
            },
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.info().name
    }

    /// On-disk prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        self.info().prefix
    }

    /// UI icon identifier.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        self.info().icon
    }

    /// Look up a type by its prefix (exact, case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentTypeNotFound`] if no variant has `prefix`.
    pub fn from_prefix(prefix: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
            .ok_or_else(|| Error::ExperimentTypeNotFound {
                prefix: prefix.to_string(),
            })
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExperimentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_prefix(s)
    }
}

impl Serialize for ExperimentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.prefix())
    }
}

impl<'de> Deserialize<'de> for ExperimentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let prefix = String::deserialize(deserializer)?;
        Self::from_prefix(&prefix).map_err(serde::de::Error::custom)
    }
}
