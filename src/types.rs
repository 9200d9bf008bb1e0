use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "azure").
    pub owner: String,
    /// The name of the repository (e.g., "aro-rp").
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// An account that opened or reviewed a pull request.
///
/// `id` is the stable account ID and the only thing contributors are keyed by;
/// `login` is kept for display since it can change over time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: u64,
    pub login: String,
}

impl Contributor {
    pub fn new(id: u64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PRState {
    Open,
    Closed,
    Merged,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    /// Repository-scoped number, used to address the pull request's reviews.
    pub number: u64,
    pub author: Contributor,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub state: PRState,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.state == PRState::Merged
    }
}

/// The outcome a reviewer recorded on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewDisposition {
    Approved,
    ChangesRequested,
    Commented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: Contributor,
    pub disposition: ReviewDisposition,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One page of pull requests as returned by a [`crate::source::RemoteSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestPage {
    pub items: Vec<PullRequest>,
    pub has_more: bool,
}
