//! Tag filter engine.
//!
//! A record is retained when at least one of its tag values contains the
//! search term, compared case-insensitively. An empty term retains every
//! record. Filtering never mutates its input and is only recomputed when the
//! caller commits a term through [`FilterState::commit`], so partially typed
//! input leaves the previous view in place.

use super::state::{NetworkTopology, Tagged};

/// Returns true if any tag value of `record` contains `term`, ignoring case.
/// Surrounding whitespace in `term` is ignored; an empty term matches everything.
pub fn matches_term<T: Tagged + ?Sized>(record: &T, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record
        .tags()
        .iter()
        .any(|tag| tag.value.to_lowercase().contains(&needle))
}

/// Derive the filtered view of `records` for `term`
pub fn filter<T: Tagged + Clone>(records: &[T], term: &str) -> Vec<T> {
    records
        .iter()
        .filter(|r| matches_term(*r, term))
        .cloned()
        .collect()
}

/// Filter each of the three network sequences independently
pub fn filter_topology(topology: &NetworkTopology, term: &str) -> NetworkTopology {
    NetworkTopology {
        vpcs: filter(&topology.vpcs, term),
        subnets: filter(&topology.subnets, term),
        nat_gateways: filter(&topology.nat_gateways, term),
    }
}

/// Transient search box state for one resource page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    draft: String,
    committed: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the text being typed. Does not affect the committed term.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// The term the current filtered view was derived from
    pub fn search_term(&self) -> &str {
        &self.committed
    }

    /// Commit the draft (end of input). Returns true if the committed term changed.
    pub fn commit(&mut self) -> bool {
        if self.committed == self.draft {
            return false;
        }
        self.committed = self.draft.clone();
        true
    }

    pub fn clear(&mut self) {
        self.draft.clear();
        self.committed.clear();
    }
}
