//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs how runs page through GitHub, how reviews
//! are counted, and how the HTTP service caches finished reports.

use crate::aggregator::{Aggregator, RunOptions, SelfReviewPolicy};
use crate::types::RepoId;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Optional GitHub Personal Access Token for higher rate limits.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Older name for the token, used when `GITHUB_TOKEN` is not set.
    #[serde(default)]
    pub gh_pat: Option<String>,

    /// Number of pull requests requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u8,

    /// First page of pull requests to request.
    #[serde(default = "default_initial_page")]
    pub initial_page: u32,

    /// Maximum number of concurrent review listings per page of pull requests.
    #[serde(default = "default_review_fetch_concurrency")]
    pub review_fetch_concurrency: usize,

    /// Whether a pull request author's reviews of their own pull request are counted.
    #[serde(default = "default_count_self_reviews")]
    pub count_self_reviews: bool,

    /// Runs taking longer than this are abandoned.
    #[serde(default = "default_run_timeout_seconds")]
    pub run_timeout_seconds: u64,

    /// Lookback used by the HTTP service when a request does not specify one.
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: i64,

    /// Time to live for cached reports in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// Maximum number of entries to keep in the report cache.
    #[serde(default = "default_cache_max_capacity")]
    pub cache_max_capacity: u64,

    /// Port the HTTP service listens on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_page_size() -> u8 {
    RunOptions::DEFAULT_PAGE_SIZE
}

fn default_initial_page() -> u32 {
    1
}

fn default_review_fetch_concurrency() -> usize {
    Aggregator::DEFAULT_REVIEW_CONCURRENCY
}

fn default_count_self_reviews() -> bool {
    true
}

fn default_run_timeout_seconds() -> u64 {
    300
}

fn default_lookback_days() -> i64 {
    30
}

fn default_cache_ttl_seconds() -> u64 {
    600
}

fn default_cache_max_capacity() -> u64 {
    100
}

fn default_port() -> u16 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            gh_pat: None,
            page_size: default_page_size(),
            initial_page: default_initial_page(),
            review_fetch_concurrency: default_review_fetch_concurrency(),
            count_self_reviews: default_count_self_reviews(),
            run_timeout_seconds: default_run_timeout_seconds(),
            default_lookback_days: default_lookback_days(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_max_capacity: default_cache_max_capacity(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// The token to authenticate with; `GITHUB_TOKEN` takes precedence over `GH_PAT`.
    pub fn github_token(&self) -> Option<String> {
        self.github_token.clone().or_else(|| self.gh_pat.clone())
    }

    pub fn cache_ttl(&self) -> StdDuration {
        StdDuration::from_secs(self.cache_ttl_seconds)
    }

    pub fn run_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.run_timeout_seconds)
    }

    pub fn self_review_policy(&self) -> SelfReviewPolicy {
        if self.count_self_reviews {
            SelfReviewPolicy::Count
        } else {
            SelfReviewPolicy::Exclude
        }
    }

    /// Builds the aggregator for one run over `repo_id`, looking back `days` from `now`.
    pub fn aggregator(
        &self,
        repo_id: RepoId,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Aggregator, crate::error::StatsError> {
        let options = RunOptions::with_lookback_days(repo_id, days, now)?
            .page_size(self.page_size)
            .initial_page(self.initial_page)
            .self_reviews(self.self_review_policy());

        Ok(Aggregator::new(options).with_review_concurrency(self.review_fetch_concurrency))
    }
}
