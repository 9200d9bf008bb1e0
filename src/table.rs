use crate::types::{Contributor, ReviewDisposition};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Read-only view of a finished run, keyed by account ID.
pub type ContributorSnapshot = BTreeMap<u64, ContributorAccumulator>;

/// Per-contributor participation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContributorAccumulator {
    /// Most recently observed login for this account.
    pub login: String,
    pub approvals: u32,
    pub comments: u32,
    pub changes_requested: u32,
    pub pulls_opened: u32,
    pub pulls_merged: u32,
    /// IDs of the pull requests this contributor opened.
    pub pull_ids: BTreeSet<u64>,
}

impl ContributorAccumulator {
    /// Counts a pull request opened by this contributor.
    ///
    /// A pull request ID already present is ignored, which keeps
    /// `pulls_opened == pull_ids.len()` and `pulls_merged <= pulls_opened`.
    pub fn record_opened(&mut self, pull_id: u64, merged: bool) -> bool {
        if !self.pull_ids.insert(pull_id) {
            return false;
        }
        self.pulls_opened += 1;
        if merged {
            self.pulls_merged += 1;
        }
        true
    }

    /// Counts exactly one review against the matching disposition counter.
    pub fn record_review(&mut self, disposition: ReviewDisposition) {
        match disposition {
            ReviewDisposition::Approved => self.approvals += 1,
            ReviewDisposition::ChangesRequested => self.changes_requested += 1,
            ReviewDisposition::Commented => self.comments += 1,
        }
    }

    pub fn reviews(&self) -> u32 {
        self.approvals + self.changes_requested + self.comments
    }
}

/// Keyed store of accumulators for a single run.
///
/// Not synchronised: one task owns the table while a run is in progress.
#[derive(Debug, Default)]
pub struct ContributorTable {
    contributors: ContributorSnapshot,
    folded_pulls: HashSet<u64>,
}

impl ContributorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulator for `contributor`, inserting a zeroed one first if needed.
    pub fn get_or_create(&mut self, contributor: &Contributor) -> &mut ContributorAccumulator {
        let entry = self.contributors.entry(contributor.id).or_default();
        if entry.login != contributor.login {
            entry.login.clone_from(&contributor.login);
        }
        entry
    }

    /// Records that a pull request has been folded into the table.
    ///
    /// Returns `false` when it already was, in which case the caller must not
    /// count it (or its reviews) again.
    pub fn mark_folded(&mut self, pull_id: u64) -> bool {
        self.folded_pulls.insert(pull_id)
    }

    pub fn is_folded(&self, pull_id: u64) -> bool {
        self.folded_pulls.contains(&pull_id)
    }

    pub fn get(&self, id: u64) -> Option<&ContributorAccumulator> {
        self.contributors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    pub fn snapshot(&self) -> &ContributorSnapshot {
        &self.contributors
    }

    pub fn into_snapshot(self) -> ContributorSnapshot {
        self.contributors
    }
}
