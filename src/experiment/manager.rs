//! Experiment Manager - in-memory snapshot answering filter queries
//!
//! The manager is built once from a discovery scan and never mutated.
//! Rediscovery means building a new manager.

use super::{Experiment, ExperimentLoader, ExperimentType, FilterCriteria, FilterPolicy};
use crate::Result;

/// Read-only collection of discovered experiments.
///
/// ## Filtering
///
/// Every filter call runs over the full snapshot, in snapshot order; the
/// result of one call never feeds the next.
#[derive(Debug, Clone, Default)]
pub struct ExperimentManager {
    experiments: Vec<Experiment>,
}

impl ExperimentManager {
    /// Create a manager holding `experiments` in the given order.
    #[must_use]
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self { experiments }
    }

    /// Run a discovery scan and hold its result.
    ///
    /// # Errors
    ///
    /// Propagates discovery errors (unknown type prefix, unreachable
    /// location, malformed metadata).
    pub fn discover(loader: &dyn ExperimentLoader, data_set: Option<&str>) -> Result<Self> {
        Ok(Self::new(loader.load_experiments(data_set)?))
    }

    /// All held experiments, in snapshot order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Number of held experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Check if no experiments are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Get an experiment by its full identifier.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<&Experiment> {
        self.experiments
            .iter()
            .find(|exp| exp.experiment_id() == experiment_id)
    }

    /// First experiment of `experiment_type` with `short_id`.
    ///
    /// Short ids are only a row key within one listing, so this is the
    /// lookup a detail view keyed by `(prefix, short_id)` needs.
    #[must_use]
    pub fn find_by_short_id(
        &self,
        experiment_type: ExperimentType,
        short_id: &str,
    ) -> Option<&Experiment> {
        self.experiments
            .iter()
            .find(|exp| exp.experiment_type() == experiment_type && exp.short_id() == short_id)
    }

    /// Experiments sorted by `experiment_id`.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Experiment> {
        let mut sorted: Vec<&Experiment> = self.experiments.iter().collect();
        sorted.sort();
        sorted
    }

    /// Experiments matching every criterion, in snapshot order.
    ///
    /// Unknown attributes match nothing. Incomparable values are logged as
    /// warnings and count as non-matching. Empty criteria return everything.
    #[must_use]
    pub fn filter_by(&self, criteria: &FilterCriteria) -> Vec<&Experiment> {
        self.experiments
            .iter()
            .filter(|exp| {
                criteria
                    .matches(exp, FilterPolicy::Lenient)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Like [`filter_by`](Self::filter_by), but unknown attributes and
    /// incomparable values are errors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownAttribute`] or
    /// [`crate::Error::FilterTypeMismatch`] for the first offending criterion.
    pub fn try_filter_by(&self, criteria: &FilterCriteria) -> Result<Vec<&Experiment>> {
        self.filter_with_policy(criteria, FilterPolicy::Strict)
    }

    /// Filter with an explicit policy.
    ///
    /// # Errors
    ///
    /// Only with [`FilterPolicy::Strict`], see [`try_filter_by`](Self::try_filter_by).
    pub fn filter_with_policy(
        &self,
        criteria: &FilterCriteria,
        policy: FilterPolicy,
    ) -> Result<Vec<&Experiment>> {
        let mut matched = Vec::new();
        for experiment in &self.experiments {
            if criteria.matches(experiment, policy)? {
                matched.push(experiment);
            }
        }
        Ok(matched)
    }
}
