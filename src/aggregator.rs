//! Aggregation of pull-request and review activity into per-contributor counters.
//!
//! The [`Aggregator`] walks every page of a repository's pull requests,
//! filters them against the cutoff, fetches reviews for the ones in range and
//! folds everything into a [`ContributorTable`]. Pages are never assumed to be
//! sorted by creation date, so the whole feed is always scanned.

use crate::error::StatsError;
use crate::pages::pull_request_pages;
use crate::source::RemoteSource;
use crate::table::ContributorTable;
use crate::types::{PullRequest, RepoId, Review};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration as StdDuration;
use tokio::sync::watch;

/// How reviews by a pull request's own author are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfReviewPolicy {
    /// Self-reviews count like any other review.
    #[default]
    Count,
    /// Reviews whose reviewer authored the pull request are ignored.
    Exclude,
}

/// Parameters for a single aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub repo: RepoId,
    /// Pull requests created at or before this instant are excluded.
    pub cutoff: DateTime<Utc>,
    pub page_size: u8,
    /// 1-based page to start listing from.
    pub initial_page: u32,
    pub self_reviews: SelfReviewPolicy,
}

impl RunOptions {
    pub const DEFAULT_PAGE_SIZE: u8 = 30;

    pub fn new(repo: RepoId, cutoff: DateTime<Utc>) -> Self {
        Self {
            repo,
            cutoff,
            page_size: Self::DEFAULT_PAGE_SIZE,
            initial_page: 1,
            self_reviews: SelfReviewPolicy::default(),
        }
    }

    /// Builds options whose cutoff lies `days` before `now`.
    pub fn with_lookback_days(
        repo: RepoId,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, StatsError> {
        if days < 0 {
            return Err(StatsError::InvalidOptions(format!(
                "lookback days must not be negative, got {days}"
            )));
        }
        let lookback = Duration::try_days(days).ok_or_else(|| {
            StatsError::InvalidOptions(format!("lookback of {days} days is out of range"))
        })?;
        let cutoff = now.checked_sub_signed(lookback).ok_or_else(|| {
            StatsError::InvalidOptions(format!("lookback of {days} days is out of range"))
        })?;
        Ok(Self::new(repo, cutoff))
    }

    pub fn page_size(mut self, page_size: u8) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn initial_page(mut self, initial_page: u32) -> Self {
        self.initial_page = initial_page;
        self
    }

    pub fn self_reviews(mut self, policy: SelfReviewPolicy) -> Self {
        self.self_reviews = policy;
        self
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.repo.owner.trim().is_empty() {
            return Err(StatsError::InvalidOptions("owner must not be empty".into()));
        }
        if self.repo.repo.trim().is_empty() {
            return Err(StatsError::InvalidOptions(
                "repository name must not be empty".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(StatsError::InvalidOptions(
                "page size must be positive".into(),
            ));
        }
        if self.initial_page == 0 {
            return Err(StatsError::InvalidOptions(
                "initial page must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

pub struct Aggregator {
    options: RunOptions,
    review_concurrency: usize,
}

impl Aggregator {
    pub const DEFAULT_REVIEW_CONCURRENCY: usize = 8;

    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            review_concurrency: Self::DEFAULT_REVIEW_CONCURRENCY,
        }
    }

    /// Maximum number of review listings in flight for one page.
    pub fn with_review_concurrency(mut self, limit: usize) -> Self {
        self.review_concurrency = limit.max(1);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Whether a pull request falls inside the window (strictly after the cutoff).
    pub fn in_window(&self, pr: &PullRequest) -> bool {
        pr.created_at > self.options.cutoff
    }

    /// Walks the whole feed and returns the finished table.
    ///
    /// Any fetch failure aborts the run; no partial table is ever returned.
    pub async fn run<S>(&self, source: &S) -> Result<ContributorTable, StatsError>
    where
        S: RemoteSource + ?Sized,
    {
        self.options.validate()?;

        let repo = &self.options.repo;
        tracing::info!(
            owner = %repo.owner,
            repo = %repo.repo,
            cutoff = %self.options.cutoff,
            page_size = self.options.page_size,
            "Starting contributor stats run"
        );

        let mut table = ContributorTable::new();
        let pages = pull_request_pages(
            source,
            repo,
            self.options.initial_page,
            self.options.page_size,
        );
        futures::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            let pending = self.select_pending(&table, page);

            let fetched: Vec<(PullRequest, Vec<Review>)> = stream::iter(pending)
                .map(|pr| async move {
                    let reviews = source.list_reviews(repo, pr.number).await.map_err(|e| {
                        StatsError::transport(
                            format!("listing reviews for {repo}#{}", pr.number),
                            e,
                        )
                    })?;
                    Ok::<_, StatsError>((pr, reviews))
                })
                .buffered(self.review_concurrency)
                .try_collect()
                .await?;

            for (pr, reviews) in &fetched {
                self.fold(&mut table, pr, reviews);
            }
        }

        tracing::info!(
            owner = %repo.owner,
            repo = %repo.repo,
            contributors = table.len(),
            "Finished contributor stats run"
        );

        Ok(table)
    }

    /// Like [`Aggregator::run`], but gives up with [`StatsError::Cancelled`]
    /// as soon as `cancel` turns `true`. In-flight fetches are dropped.
    pub async fn run_until_cancelled<S>(
        &self,
        source: &S,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ContributorTable, StatsError>
    where
        S: RemoteSource + ?Sized,
    {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::warn!(repo = %self.options.repo, "Contributor stats run cancelled");
                Err(StatsError::Cancelled)
            }
            result = self.run(source) => result,
        }
    }

    /// Like [`Aggregator::run`], reporting [`StatsError::Cancelled`] if the
    /// run does not finish within `limit`.
    pub async fn run_with_timeout<S>(
        &self,
        source: &S,
        limit: StdDuration,
    ) -> Result<ContributorTable, StatsError>
    where
        S: RemoteSource + ?Sized,
    {
        match tokio::time::timeout(limit, self.run(source)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    repo = %self.options.repo,
                    timeout_secs = limit.as_secs(),
                    "Contributor stats run timed out"
                );
                Err(StatsError::Cancelled)
            }
        }
    }

    /// Folds one pull request and its reviews into `table`.
    ///
    /// Returns `false` without touching the table if the pull request is
    /// outside the window or has already been folded.
    pub fn fold(
        &self,
        table: &mut ContributorTable,
        pr: &PullRequest,
        reviews: &[Review],
    ) -> bool {
        if !self.in_window(pr) || !table.mark_folded(pr.id) {
            return false;
        }

        table
            .get_or_create(&pr.author)
            .record_opened(pr.id, pr.is_merged());

        for review in reviews {
            if self.options.self_reviews == SelfReviewPolicy::Exclude
                && review.reviewer.id == pr.author.id
            {
                tracing::debug!(
                    pull = pr.number,
                    reviewer = %review.reviewer.login,
                    "Skipping self-review"
                );
                continue;
            }
            table
                .get_or_create(&review.reviewer)
                .record_review(review.disposition);
        }

        true
    }

    /// Drops pull requests that are out of the window or already counted,
    /// including repeats within the page itself.
    fn select_pending(
        &self,
        table: &ContributorTable,
        page: Vec<PullRequest>,
    ) -> Vec<PullRequest> {
        let mut seen = HashSet::new();
        page.into_iter()
            .filter(|pr| {
                if !self.in_window(pr) {
                    tracing::debug!(
                        pull = pr.number,
                        created_at = %pr.created_at,
                        "Skipping pull request created before cutoff"
                    );
                    return false;
                }
                if table.is_folded(pr.id) || !seen.insert(pr.id) {
                    tracing::debug!(pull = pr.number, "Skipping pull request already counted");
                    return false;
                }
                true
            })
            .collect()
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // A dropped sender can never cancel the run.
    if rx.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}
