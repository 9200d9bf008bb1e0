#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use repo_stats::error::BoxError;
use repo_stats::source::RemoteSource;
use repo_stats::types::{
    Contributor, PRState, PullRequest, PullRequestPage, RepoId, Review, ReviewDisposition,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub type PullRequestWithReviews = (PullRequest, Vec<Review>);

/// In-memory feed with scripted pages and per-pull reviews.
#[derive(Default)]
pub struct FakeSource {
    pages: Vec<Vec<PullRequest>>,
    reviews: HashMap<u64, Vec<Review>>,
    failing_page: Option<u32>,
    failing_review: Option<u64>,
    review_delay: Option<std::time::Duration>,
    pub page_requests: Mutex<Vec<u32>>,
    pub review_requests: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, items: Vec<PullRequest>) -> Self {
        self.pages.push(items);
        self
    }

    pub fn reviews(mut self, number: u64, reviews: Vec<Review>) -> Self {
        self.reviews.insert(number, reviews);
        self
    }

    pub fn fail_on_page(mut self, page: u32) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn fail_on_reviews(mut self, number: u64) -> Self {
        self.failing_review = Some(number);
        self
    }

    pub fn slow_reviews(mut self, delay: std::time::Duration) -> Self {
        self.review_delay = Some(delay);
        self
    }

    pub fn review_requests(&self) -> usize {
        self.review_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn list_pull_requests(
        &self,
        _repo: &RepoId,
        page: u32,
        _per_page: u8,
    ) -> Result<PullRequestPage, BoxError> {
        self.page_requests.lock().unwrap().push(page);
        if self.failing_page == Some(page) {
            return Err(format!("502 Bad Gateway on page {page}").into());
        }

        let index = page as usize - 1;
        Ok(PullRequestPage {
            items: self.pages.get(index).cloned().unwrap_or_default(),
            has_more: index + 1 < self.pages.len(),
        })
    }

    async fn list_reviews(&self, _repo: &RepoId, number: u64) -> Result<Vec<Review>, BoxError> {
        self.review_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.review_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_review == Some(number) {
            return Err(format!("connection reset while listing reviews for #{number}").into());
        }
        Ok(self.reviews.get(&number).cloned().unwrap_or_default())
    }
}

pub fn repo() -> RepoId {
    RepoId::new("azure", "aro-rp")
}

pub fn cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn user(id: u64) -> Contributor {
    Contributor::new(id, format!("user{id}"))
}

pub fn pull(id: u64, author: u64, created_at: DateTime<Utc>, merged: bool) -> PullRequest {
    PullRequest {
        id: id * 1000,
        number: id,
        author: user(author),
        created_at,
        merged_at: merged.then(|| created_at + Duration::hours(2)),
        state: if merged { PRState::Merged } else { PRState::Open },
    }
}

pub fn review(reviewer: u64, disposition: ReviewDisposition) -> Review {
    Review {
        reviewer: user(reviewer),
        disposition,
        submitted_at: None,
    }
}
