// Candidate Set - working set of a discrimination session

use std::collections::BTreeSet;

use crate::domain::engine::EngineName;

/// The still-possible engines during a discrimination session.
///
/// Shrinks monotonically; a session holding an empty set has already
/// terminated with a contradiction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet(BTreeSet<EngineName>);

impl CandidateSet {
    pub fn new(engines: BTreeSet<EngineName>) -> Self {
        Self(engines)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &EngineName) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineName> {
        self.0.iter()
    }

    /// Keep only engines satisfying the predicate. Never grows.
    pub fn retain(&mut self, f: impl FnMut(&EngineName) -> bool) {
        self.0.retain(f);
    }

    pub fn as_set(&self) -> &BTreeSet<EngineName> {
        &self.0
    }

    pub fn into_set(self) -> BTreeSet<EngineName> {
        self.0
    }
}

impl FromIterator<EngineName> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = EngineName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
