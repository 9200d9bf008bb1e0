//! Lazy page producer over a [`RemoteSource`].

use crate::error::StatsError;
use crate::source::RemoteSource;
use crate::types::{PullRequest, RepoId};
use futures::stream::{self, Stream};

/// Yields pages of pull requests starting at `first_page`.
///
/// The stream ends after a page that reports no further pages, or at the first
/// empty page. A fetch error is yielded once and ends the stream.
pub fn pull_request_pages<'a, S>(
    source: &'a S,
    repo: &'a RepoId,
    first_page: u32,
    per_page: u8,
) -> impl Stream<Item = Result<Vec<PullRequest>, StatsError>> + Send + 'a
where
    S: RemoteSource + ?Sized,
{
    stream::try_unfold(Some(first_page), move |next| async move {
        let Some(page) = next else {
            return Ok::<_, StatsError>(None);
        };

        let batch = source
            .list_pull_requests(repo, page, per_page)
            .await
            .map_err(|e| {
                StatsError::transport(format!("listing pull requests for {repo} (page {page})"), e)
            })?;

        tracing::debug!(
            owner = %repo.owner,
            repo = %repo.repo,
            page,
            items = batch.items.len(),
            has_more = batch.has_more,
            "Fetched pull request page"
        );

        if batch.items.is_empty() {
            return Ok(None);
        }

        let following = if batch.has_more {
            page.checked_add(1)
        } else {
            None
        };

        Ok(Some((batch.items, following)))
    })
}
