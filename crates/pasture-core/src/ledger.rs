use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Set of URL fingerprints that have been scraped and stored.
///
/// Grows monotonically; nothing in the pipeline removes entries. Serialized
/// as a sorted JSON array so that a load followed by a save reproduces the
/// same bytes.
///
/// The ledger is a single-writer structure: the scheduler runs passes one at
/// a time and hands the same `&mut Ledger` to each. Running passes
/// concurrently would need a lock around `contains` + `add` + save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    fingerprints: BTreeSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Record a fingerprint. Returns false if it was already present.
    pub fn add(&mut self, fingerprint: impl Into<String>) -> bool {
        self.fingerprints.insert(fingerprint.into())
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl FromIterator<String> for Ledger {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            fingerprints: iter.into_iter().collect(),
        }
    }
}
