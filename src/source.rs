//! The remote feed the aggregator reads from.
//!
//! [`RemoteSource`] is the seam between the aggregation core and whatever
//! serves pull requests and reviews. The production implementation lives in
//! [`crate::github`]; tests substitute an in-memory feed.

use crate::error::BoxError;
use crate::types::{PullRequestPage, RepoId, Review};
use async_trait::async_trait;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// List one page of pull requests in any state.
    ///
    /// `page` is 1-based. `has_more` on the result reports whether a further
    /// page exists.
    async fn list_pull_requests(
        &self,
        repo: &RepoId,
        page: u32,
        per_page: u8,
    ) -> Result<PullRequestPage, BoxError>;

    /// List every review submitted on the pull request with the given number.
    async fn list_reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<Review>, BoxError>;
}
