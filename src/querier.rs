//! Service layer for running and caching contributor reports.
//!
//! `StatsQuerier` is the entry point the HTTP service uses. Every cache miss performs an
//! independent aggregation run against the shared remote source; finished reports are kept in
//! an in-memory cache for the configured TTL.

use crate::config::AppConfig;
use crate::error::StatsError;
use crate::report::ContributorReport;
use crate::source::RemoteSource;
use crate::types::RepoId;
use chrono::Utc;
use moka::future::Cache;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub repo_id: RepoId,
    pub days: i64,
}

#[derive(Clone)]
pub struct StatsQuerier {
    cache: Cache<ReportKey, Arc<ContributorReport>>,
    source: Arc<dyn RemoteSource>,
    config: AppConfig,
}

impl StatsQuerier {
    pub fn new(config: &AppConfig, source: Arc<dyn RemoteSource>) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_max_capacity)
            .time_to_live(config.cache_ttl())
            .build();

        Self {
            cache,
            source,
            config: config.clone(),
        }
    }

    /// Retrieves the report for a repository, running the aggregation if not cached (read-through).
    ///
    /// Concurrent misses on the same key share a single run. Failed runs are not cached.
    pub async fn get(
        &self,
        repo_id: RepoId,
        days: i64,
    ) -> Result<Arc<ContributorReport>, Arc<StatsError>> {
        let key = ReportKey {
            repo_id: repo_id.clone(),
            days,
        };

        self.cache
            .try_get_with(key, async {
                tracing::debug!(repo_id = %repo_id, days, "Report not cached, starting run");
                let report = self.run(&repo_id, days).await?;
                Ok::<_, StatsError>(Arc::new(report))
            })
            .await
    }

    /// Performs one uncached run and builds its report.
    pub async fn run(&self, repo_id: &RepoId, days: i64) -> Result<ContributorReport, StatsError> {
        let aggregator = self.config.aggregator(repo_id.clone(), days, Utc::now())?;
        let table = aggregator
            .run_with_timeout(self.source.as_ref(), self.config.run_timeout())
            .await?;

        Ok(ContributorReport::from_snapshot(
            repo_id.clone(),
            aggregator.options().cutoff,
            table.snapshot(),
        ))
    }
}
