//! Experiment - one discovered experiment run

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::ExperimentType;

/// One completed experiment run, as discovered from storage.
///
/// Identity is the `experiment_id`: equality, ordering and hashing look at
/// nothing else. Records are immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    experiment_type: ExperimentType,
    name: String,
    description: String,
    experiment_id: String,
    short_id: String,
    git_version: BTreeMap<String, String>,
    data_set: String,
}

impl Experiment {
    /// Attribute names in declaration order.
    pub const FIELDS: [&'static str; 7] = [
        "experiment_type",
        "name",
        "description",
        "experiment_id",
        "short_id",
        "git_version",
        "data_set",
    ];

    /// Create a builder with the required type and identifier.
    #[must_use]
    pub fn builder(
        experiment_type: ExperimentType,
        experiment_id: impl Into<String>,
    ) -> ExperimentBuilder {
        ExperimentBuilder::new(experiment_type, experiment_id)
    }

    /// Get the experiment type.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        self.experiment_type
    }

    /// Get the human label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the full unique identifier.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the short identifier (not guaranteed unique).
    #[must_use]
    pub fn short_id(&self) -> &str {
        &self.short_id
    }

    /// Get the component → version mapping.
    #[must_use]
    pub const fn git_version(&self) -> &BTreeMap<String, String> {
        &self.git_version
    }

    /// Get the data set label.
    #[must_use]
    pub fn data_set(&self) -> &str {
        &self.data_set
    }

    /// Display strings keyed by attribute name.
    ///
    /// The type is rendered as its prefix and git versions as
    /// `component:version` pairs joined by `", "`.
    #[must_use]
    pub fn to_row(&self) -> BTreeMap<&'static str, String> {
        let git_version = self
            .git_version
            .iter()
            .map(|(component, version)| format!("{component}:{version}"))
            .collect::<Vec<_>>()
            .join(", ");

        BTreeMap::from([
            ("experiment_type", self.experiment_type.prefix().to_string()),
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("experiment_id", self.experiment_id.clone()),
            ("short_id", self.short_id.clone()),
            ("git_version", git_version),
            ("data_set", self.data_set.clone()),
        ])
    }

    /// Table columns for every attribute except the experiment type.
    #[must_use]
    pub fn column_spec() -> Vec<ColumnSpec> {
        Self::FIELDS
            .into_iter()
            .filter(|field| *field != "experiment_type")
            .map(|field| ColumnSpec {
                name: field,
                label: format_label(field),
                field,
                align: Align::Left,
                sortable: true,
            })
            .collect()
    }
}

impl PartialEq for Experiment {
    fn eq(&self, other: &Self) -> bool {
        self.experiment_id == other.experiment_id
    }
}

impl Eq for Experiment {}

impl PartialOrd for Experiment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Experiment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.experiment_id.cmp(&other.experiment_id)
    }
}

impl Hash for Experiment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.experiment_id.hash(state);
    }
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    experiment_type: ExperimentType,
    name: String,
    description: String,
    experiment_id: String,
    short_id: String,
    git_version: BTreeMap<String, String>,
    data_set: String,
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment_type: ExperimentType, experiment_id: impl Into<String>) -> Self {
        Self {
            experiment_type,
            name: String::new(),
            description: String::new(),
            experiment_id: experiment_id.into(),
            short_id: String::new(),
            git_version: BTreeMap::new(),
            data_set: String::new(),
        }
    }

    /// Set the human label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the short identifier.
    #[must_use]
    pub fn short_id(mut self, short_id: impl Into<String>) -> Self {
        self.short_id = short_id.into();
        self
    }

    /// Set the git versions, replacing any previous ones.
    #[must_use]
    pub fn git_version<I, K, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.git_version = versions
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set the data set label.
    #[must_use]
    pub fn data_set(mut self, data_set: impl Into<String>) -> Self {
        self.data_set = data_set.into();
        self
    }

    /// Build the `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment {
        Experiment {
            experiment_type: self.experiment_type,
            name: self.name,
            description: self.description,
            experiment_id: self.experiment_id,
            short_id: self.short_id,
            git_version: self.git_version,
            data_set: self.data_set,
        }
    }
}

/// Column alignment. Every attribute column is left aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Left aligned
    Left,
}

/// One table column derived from an experiment attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: &'static str,
    /// Header label
    pub label: String,
    /// Row field the column reads
    pub field: &'static str,
    /// Alignment
    pub align: Align,
    /// Whether the column can be sorted
    pub sortable: bool,
}

/// `snake_case` attribute name to a header label (`"short_id"` → `"Short id"`).
#[must_use]
pub fn format_label(attribute: &str) -> String {
    let spaced = attribute.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Experiment {
        Experiment::builder(ExperimentType::SemSeg, "123456")
            .name("Test Experiment")
            .description("Description of the test experiment")
            .short_id("ABC")
            .git_version([("expdash", "v1.0"), ("trainer", "v0.11.0")])
            .data_set("test datasets")
            .build()
    }

    #[test]
    fn test_experiment_builder() {
        let experiment = sample();
        assert_eq!(experiment.experiment_type(), ExperimentType::SemSeg);
        assert_eq!(experiment.name(), "Test Experiment");
        assert_eq!(experiment.short_id(), "ABC");
        assert_eq!(experiment.git_version().len(), 2);
    }

    #[test]
    fn test_to_row() {
        let row = sample().to_row();
        assert_eq!(row["git_version"], "expdash:v1.0, trainer:v0.11.0");
        assert_eq!(row["short_id"], "ABC");
        assert_eq!(row["experiment_id"], "123456");
        assert_eq!(row["description"], "Description of the test experiment");
        assert_eq!(row["name"], "Test Experiment");
        assert_eq!(row["experiment_type"], "SEG");
        assert_eq!(row["data_set"], "test datasets");
        assert_eq!(row.len(), Experiment::FIELDS.len());
    }

    #[test]
    fn test_column_spec() {
        let columns = Experiment::column_spec();
        let names: Vec<_> = columns.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["name", "description", "experiment_id", "short_id", "git_version", "data_set"]
        );
        assert_eq!(columns[2].label, "Experiment id");
        assert!(columns.iter().all(|c| c.sortable && c.align == Align::Left && c.name == c.field));

        let json = serde_json::to_value(&columns[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "name",
                "label": "Name",
                "field": "name",
                "align": "left",
                "sortable": true
            })
        );
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label("test_string_with_underscores"), "Test string with underscores");
        assert_eq!(format_label("GIT_Version"), "Git version");
        assert_eq!(format_label(""), "");
    }

    #[test]
    fn test_identity_is_experiment_id() {
        let a = sample();
        let b = Experiment::builder(ExperimentType::Cls, "123456")
            .name("Other")
            .build();
        let c = Experiment::builder(ExperimentType::SemSeg, "123457").build();

        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }
}
