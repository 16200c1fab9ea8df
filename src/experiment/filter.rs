//! Attribute-based filter criteria

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Experiment, ExperimentType};
use crate::{Error, Result};

/// Borrowed view of one experiment attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue<'a> {
    /// String attribute
    Text(&'a str),
    /// The experiment type
    Type(ExperimentType),
    /// Component → version mapping
    Versions(&'a BTreeMap<String, String>),
}

impl AttributeValue<'_> {
    /// Kind name used in mismatch reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Type(_) => "experiment type",
            Self::Versions(_) => "version mapping",
        }
    }
}

impl Experiment {
    /// Look up an attribute by name, `None` if experiments have no such attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<AttributeValue<'_>> {
        Some(match name {
            "experiment_type" => AttributeValue::Type(self.experiment_type()),
            "name" => AttributeValue::Text(self.name()),
            "description" => AttributeValue::Text(self.description()),
            "experiment_id" => AttributeValue::Text(self.experiment_id()),
            "short_id" => AttributeValue::Text(self.short_id()),
            "git_version" => AttributeValue::Versions(self.git_version()),
            "data_set" => AttributeValue::Text(self.data_set()),
            _ => return None,
        })
    }
}

/// Required value for one filter criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Matches string attributes
    Text(String),
    /// Matches the experiment type
    Type(ExperimentType),
    /// Matches the git-version mapping (whole-map equality)
    Versions(BTreeMap<String, String>),
}

impl FilterValue {
    /// Kind name used in mismatch reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Type(_) => "experiment type",
            Self::Versions(_) => "version mapping",
        }
    }

    /// Compare against an attribute value.
    ///
    /// `None` means the two kinds cannot be compared.
    #[must_use]
    pub fn matches(&self, attribute: AttributeValue<'_>) -> Option<bool> {
        match (self, attribute) {
            (Self::Text(want), AttributeValue::Text(have)) => Some(want == have),
            (Self::Type(want), AttributeValue::Type(have)) => Some(*want == have),
            (Self::Versions(want), AttributeValue::Versions(have)) => Some(want == have),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Type(kind) => f.write_str(kind.prefix()),
            Self::Versions(versions) => write!(f, "{versions:?}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<ExperimentType> for FilterValue {
    fn from(value: ExperimentType) -> Self {
        Self::Type(value)
    }
}

impl From<BTreeMap<String, String>> for FilterValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Versions(value)
    }
}

/// How filtering treats criteria that cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Unknown attributes and incomparable values never match (mismatches are logged).
    #[default]
    Lenient,
    /// Unknown attributes and incomparable values are errors.
    Strict,
}

/// Conjunction of attribute → value requirements.
///
/// Criteria are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    criteria: Vec<(String, FilterValue)>,
}

impl FilterCriteria {
    /// Criteria matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement that `attribute` equals `value`.
    #[must_use]
    pub fn and(mut self, attribute: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.criteria.push((attribute.into(), value.into()));
        self
    }

    /// Number of criteria.
    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Check if there are no criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Iterate over `(attribute, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.criteria.iter().map(|(attr, value)| (attr.as_str(), value))
    }

    /// Whether `experiment` satisfies every criterion.
    ///
    /// # Errors
    ///
    /// Only with [`FilterPolicy::Strict`]: [`Error::UnknownAttribute`] or
    /// [`Error::FilterTypeMismatch`].
    pub fn matches(&self, experiment: &Experiment, policy: FilterPolicy) -> Result<bool> {
        for (attribute, value) in self.iter() {
            let Some(actual) = experiment.attribute(attribute) else {
                if policy == FilterPolicy::Strict {
                    return Err(Error::UnknownAttribute(attribute.to_string()));
                }
                return Ok(false);
            };

            match value.matches(actual) {
                Some(true) => {}
                Some(false) => return Ok(false),
                None => {
                    if policy == FilterPolicy::Strict {
                        return Err(Error::FilterTypeMismatch {
                            attribute: attribute.to_string(),
                            expected: value.kind(),
                            actual: actual.kind(),
                        });
                    }
                    warn!(
                        attribute,
                        attribute_value = ?actual,
                        filter_value = %value,
                        "Incomparable types between attribute and filter value"
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl<K, V> FromIterator<(K, V)> for FilterCriteria
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            criteria: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Experiment {
        Experiment::builder(ExperimentType::ObjDet, "run-1")
            .name("Run1")
            .short_id("AB1")
            .git_version([("lib", "v1")])
            .build()
    }

    #[test]
    fn test_attribute_lookup() {
        let experiment = sample();
        assert_eq!(experiment.attribute("name"), Some(AttributeValue::Text("Run1")));
        assert_eq!(
            experiment.attribute("experiment_type"),
            Some(AttributeValue::Type(ExperimentType::ObjDet))
        );
        assert!(experiment.attribute("color").is_none());
        for field in Experiment::FIELDS {
            assert!(experiment.attribute(field).is_some(), "{field} not exposed");
        }
    }

    #[test]
    fn test_lenient_mismatch_is_non_match() {
        let criteria = FilterCriteria::new().and("experiment_type", "OBD");
        assert!(!criteria.matches(&sample(), FilterPolicy::Lenient).unwrap());
    }

    #[test]
    fn test_strict_mismatch_is_error() {
        let criteria = FilterCriteria::new().and("name", ExperimentType::Cls);
        let err = criteria.matches(&sample(), FilterPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::FilterTypeMismatch { ref attribute, .. } if attribute == "name"
        ));
    }

    #[test]
    fn test_strict_unknown_attribute_is_error() {
        let criteria = FilterCriteria::new().and("color", "red");
        assert!(matches!(
            criteria.matches(&sample(), FilterPolicy::Strict).unwrap_err(),
            Error::UnknownAttribute(_)
        ));
        assert!(!criteria.matches(&sample(), FilterPolicy::Lenient).unwrap());
    }

    #[test]
    fn test_versions_whole_map_equality() {
        let exact: BTreeMap<String, String> = [("lib".to_string(), "v1".to_string())].into();
        let criteria = FilterCriteria::new().and("git_version", exact);
        assert!(criteria.matches(&sample(), FilterPolicy::Strict).unwrap());

        let empty = FilterCriteria::new().and("git_version", BTreeMap::new());
        assert!(!empty.matches(&sample(), FilterPolicy::Strict).unwrap());
    }

    #[test]
    fn test_criteria_deserialize_from_json() {
        let criteria: FilterCriteria = serde_json::from_value(serde_json::json!({
            "criteria": [["name", "Run1"], ["git_version", {"lib": "v1"}]]
        }))
        .unwrap();
        assert_eq!(criteria.len(), 2);
        assert!(criteria.matches(&sample(), FilterPolicy::Strict).unwrap());
    }
}
