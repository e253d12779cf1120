// ── Speculative edits against a baseline snapshot ──
//
// A field is present only while its proposed value differs from the
// baseline by at least `epsilon`. Setting a field back to its baseline value
// removes the entry rather than storing it as unchanged.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::DEFAULT_CHANGE_EPSILON;

/// Last successfully fetched field values. Replaced wholesale on each fetch.
pub type Snapshot = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingChangeSet {
    changes: BTreeMap<String, f64>,
    #[serde(skip)]
    epsilon: f64,
}

impl Default for PendingChangeSet {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_EPSILON)
    }
}

impl PendingChangeSet {
    pub fn new(epsilon: f64) -> Self {
        Self {
            changes: BTreeMap::new(),
            epsilon: epsilon.abs(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Stage `value` for `field`, or drop the entry if it equals the baseline.
    /// Returns `true` if the field is pending afterwards.
    pub fn set(&mut self, field: &str, value: f64, baseline: &Snapshot) -> bool {
        if self.matches_baseline(field, value, baseline) {
            self.changes.remove(field);
            false
        } else {
            self.changes.insert(field.to_owned(), value);
            true
        }
    }

    /// Drop every pending entry.
    pub fn reset(&mut self) {
        self.changes.clear();
    }

    /// Replace the whole set with every default that differs from the
    /// baseline by more than `epsilon`. Returns how many were staged.
    pub fn reset_to_defaults<'a, I>(&mut self, defaults: I, baseline: &Snapshot) -> usize
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.changes = defaults
            .into_iter()
            .filter(|(field, value)| !self.matches_baseline(field, *value, baseline))
            .map(|(field, value)| (field.to_owned(), value))
            .collect();
        self.changes.len()
    }

    /// Drop entries that the new baseline already holds. Called whenever the
    /// snapshot is replaced.
    pub fn rebase(&mut self, baseline: &Snapshot) {
        let epsilon = self.epsilon;
        self.changes.retain(|field, value| {
            baseline
                .get(field)
                .is_none_or(|current| (current - *value).abs() >= epsilon)
        });
    }

    /// The mapping to submit.
    pub fn diff(&self) -> &BTreeMap<String, f64> {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.changes.get(field).copied()
    }

    /// Pending value if present, else the baseline value.
    pub fn effective(&self, field: &str, baseline: &Snapshot) -> Option<f64> {
        self.get(field).or_else(|| baseline.get(field).copied())
    }

    fn matches_baseline(&self, field: &str, value: f64, baseline: &Snapshot) -> bool {
        baseline
            .get(field)
            .is_some_and(|current| (current - value).abs() < self.epsilon)
    }
}
