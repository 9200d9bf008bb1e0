use crate::error::BoxError;
use crate::source::RemoteSource;
use crate::types::{
    Contributor, PRState, PullRequest, PullRequestPage, RepoId, Review, ReviewDisposition,
};
use async_trait::async_trait;
use octocrab::models::pulls::{
    PullRequest as GitHubPullRequest, Review as GitHubReview, ReviewState,
};
use octocrab::{Octocrab, Page};

/// [`RemoteSource`] backed by the GitHub REST API.
#[derive(Clone)]
pub struct GitHubSource {
    octocrab: Octocrab,
}

impl GitHubSource {
    /// Builds a client, authenticated when a personal access token is supplied.
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            octocrab: builder.build()?,
        })
    }
}

#[async_trait]
impl RemoteSource for GitHubSource {
    async fn list_pull_requests(
        &self,
        repo: &RepoId,
        page: u32,
        per_page: u8,
    ) -> Result<PullRequestPage, BoxError> {
        let current_page = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .list()
            .state(octocrab::params::State::All)
            .per_page(per_page)
            .page(page)
            .send()
            .await?;

        Ok(PullRequestPage {
            has_more: current_page.next.is_some(),
            items: current_page
                .items
                .iter()
                .filter_map(convert_pull_request)
                .collect(),
        })
    }

    async fn list_reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<Review>, BoxError> {
        let route = format!("/repos/{}/{}/pulls/{number}/reviews", repo.owner, repo.repo);
        let mut current_page: Page<GitHubReview> = self
            .octocrab
            .get(route, Some(&[("per_page", 100)]))
            .await?;

        let mut reviews = Vec::new();
        loop {
            reviews.extend(current_page.items.iter().filter_map(convert_review));

            match self.octocrab.get_page(&current_page.next).await? {
                Some(next_page) => current_page = next_page,
                None => break,
            }
        }

        Ok(reviews)
    }
}

fn convert_pull_request(pr: &GitHubPullRequest) -> Option<PullRequest> {
    let (Some(created_at), Some(user)) = (pr.created_at, pr.user.as_ref()) else {
        tracing::debug!(
            pull = pr.number,
            "Skipping pull request without author or creation time"
        );
        return None;
    };

    let state = if pr.merged_at.is_some() {
        PRState::Merged
    } else {
        match pr.state {
            Some(octocrab::models::IssueState::Open) => PRState::Open,
            Some(octocrab::models::IssueState::Closed) => PRState::Closed,
            Some(_) => PRState::Unknown,
            None => PRState::Unknown,
        }
    };

    Some(PullRequest {
        id: pr.id.into_inner(),
        number: pr.number,
        author: Contributor::new(user.id.into_inner(), user.login.clone()),
        created_at,
        merged_at: pr.merged_at,
        state,
    })
}

fn convert_review(review: &GitHubReview) -> Option<Review> {
    let user = review.user.as_ref()?;

    // Pending reviews are unsubmitted drafts; dismissed ones no longer stand.
    let disposition = match review.state.as_ref()? {
        ReviewState::Approved => ReviewDisposition::Approved,
        ReviewState::ChangesRequested => ReviewDisposition::ChangesRequested,
        ReviewState::Commented => ReviewDisposition::Commented,
        _ => return None,
    };

    Some(Review {
        reviewer: Contributor::new(user.id.into_inner(), user.login.clone()),
        disposition,
        submitted_at: review.submitted_at,
    })
}
