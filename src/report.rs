use crate::table::ContributorSnapshot;
use crate::types::RepoId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// One contributor's line in a report.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ContributorRow {
    pub id: u64,
    pub login: String,
    pub pulls_opened: u32,
    pub pulls_merged: u32,
    pub approvals: u32,
    pub changes_requested: u32,
    pub comments: u32,
    /// IDs of the pull requests this contributor opened, ascending.
    pub pull_ids: Vec<u64>,
}

impl ContributorRow {
    pub fn reviews(&self) -> u32 {
        self.approvals + self.changes_requested + self.comments
    }
}

/// The public response structure for a finished run.
#[derive(Debug, Serialize, Clone)]
pub struct ContributorReport {
    pub repository: RepoId,
    /// Exclusive lower bound on pull request creation time.
    pub since: DateTime<Utc>,
    pub contributors: Vec<ContributorRow>,
}

impl ContributorReport {
    /// Orders rows by pulls opened, then reviews submitted, then account ID.
    pub fn from_snapshot(
        repository: RepoId,
        since: DateTime<Utc>,
        snapshot: &ContributorSnapshot,
    ) -> Self {
        let mut contributors: Vec<ContributorRow> = snapshot
            .iter()
            .map(|(id, acc)| ContributorRow {
                id: *id,
                login: acc.login.clone(),
                pulls_opened: acc.pulls_opened,
                pulls_merged: acc.pulls_merged,
                approvals: acc.approvals,
                changes_requested: acc.changes_requested,
                comments: acc.comments,
                pull_ids: acc.pull_ids.iter().copied().collect(),
            })
            .collect();

        contributors.sort_by(|a, b| {
            b.pulls_opened
                .cmp(&a.pulls_opened)
                .then_with(|| b.reviews().cmp(&a.reviews()))
                .then_with(|| a.id.cmp(&b.id))
        });

        Self {
            repository,
            since,
            contributors,
        }
    }

    /// Renders the report as an aligned plain-text table.
    pub fn render_table(&self) -> String {
        let login_width = self
            .contributors
            .iter()
            .map(|row| row.login.len())
            .max()
            .unwrap_or(0)
            .max("CONTRIBUTOR".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Activity for {} since {}",
            self.repository,
            self.since.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if self.contributors.is_empty() {
            out.push_str("No activity found.\n");
            return out;
        }

        let _ = writeln!(
            out,
            "{:<login_width$}  {:>6}  {:>6}  {:>8}  {:>7}  {:>8}",
            "CONTRIBUTOR", "OPENED", "MERGED", "APPROVED", "CHANGES", "COMMENTS"
        );
        for row in &self.contributors {
            let _ = writeln!(
                out,
                "{:<login_width$}  {:>6}  {:>6}  {:>8}  {:>7}  {:>8}",
                row.login,
                row.pulls_opened,
                row.pulls_merged,
                row.approvals,
                row.changes_requested,
                row.comments
            );
        }
        out
    }
}
