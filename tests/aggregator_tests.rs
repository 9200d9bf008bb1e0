mod common;

use chrono::Duration;
use common::{cutoff, pull, repo, review, FakeSource};
use repo_stats::aggregator::{Aggregator, RunOptions, SelfReviewPolicy};
use repo_stats::error::StatsError;
use repo_stats::types::ReviewDisposition::{Approved, ChangesRequested, Commented};
use std::time::Duration as StdDuration;
use tokio::sync::watch;

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;
const D: u64 = 4;

fn aggregator() -> Aggregator {
    Aggregator::new(RunOptions::new(repo(), cutoff()))
}

#[tokio::test]
async fn test_counts_window_and_reviews() {
    let source = FakeSource::new()
        .page(vec![
            pull(1, A, cutoff() + Duration::days(1), true),
            pull(2, B, cutoff() - Duration::days(5), false),
        ])
        .reviews(1, vec![review(C, Approved)])
        .reviews(2, vec![review(C, Approved)]);

    let table = aggregator().run(&source).await.unwrap();

    let a = table.get(A).unwrap();
    assert_eq!(a.pulls_opened, 1);
    assert_eq!(a.pulls_merged, 1);
    assert_eq!(a.login, "user1");
    assert_eq!(table.get(C).unwrap().approvals, 1);
    assert!(table.get(B).is_none());
    assert_eq!(table.len(), 2);

    // Reviews of excluded pull requests are never fetched.
    assert_eq!(source.review_requests(), 1);
}

#[tokio::test]
async fn test_empty_feed_yields_empty_table() {
    let source = FakeSource::new();

    let table = aggregator().run(&source).await.unwrap();

    assert!(table.is_empty());
    assert_eq!(*source.page_requests.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_transport_failure_on_second_page_discards_results() {
    let source = FakeSource::new()
        .page(vec![pull(1, A, cutoff() + Duration::days(1), false)])
        .page(vec![pull(2, B, cutoff() + Duration::days(2), false)])
        .fail_on_page(2);

    let err = aggregator().run(&source).await.unwrap_err();

    assert!(matches!(err, StatsError::Transport { .. }));
    assert!(err.to_string().contains("page 2"));
    assert!(err
        .transport_source()
        .unwrap()
        .to_string()
        .contains("502 Bad Gateway"));
}

#[tokio::test]
async fn test_review_failure_aborts_run() {
    let source = FakeSource::new()
        .page(vec![
            pull(1, A, cutoff() + Duration::days(1), false),
            pull(2, B, cutoff() + Duration::days(1), false),
        ])
        .fail_on_reviews(2);

    let err = aggregator().run(&source).await.unwrap_err();

    assert!(matches!(err, StatsError::Transport { .. }));
    assert!(err.to_string().contains("azure/aro-rp#2"));
}

#[tokio::test]
async fn test_cutoff_boundary_is_exclusive() {
    let source = FakeSource::new().page(vec![
        pull(1, A, cutoff(), false),
        pull(2, B, cutoff() + Duration::seconds(1), false),
    ]);

    let table = aggregator().run(&source).await.unwrap();

    assert!(table.get(A).is_none());
    assert_eq!(table.get(B).unwrap().pulls_opened, 1);
}

#[tokio::test]
async fn test_unsorted_feed_is_scanned_to_the_end() {
    let source = FakeSource::new()
        .page(vec![pull(1, A, cutoff() - Duration::days(30), false)])
        .page(vec![pull(2, B, cutoff() - Duration::days(60), false)])
        .page(vec![pull(3, C, cutoff() + Duration::days(3), true)]);

    let table = aggregator().run(&source).await.unwrap();

    assert_eq!(*source.page_requests.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(C).unwrap().pulls_merged, 1);
}

#[tokio::test]
async fn test_duplicated_pages_count_once() {
    let first = pull(1, A, cutoff() + Duration::days(1), true);
    let second = pull(2, A, cutoff() + Duration::days(2), false);
    let source = FakeSource::new()
        .page(vec![first.clone(), second.clone(), first.clone()])
        .page(vec![second.clone(), first.clone()])
        .reviews(1, vec![review(B, Approved), review(C, Commented)])
        .reviews(2, vec![review(B, ChangesRequested)]);

    let table = aggregator().run(&source).await.unwrap();

    let a = table.get(A).unwrap();
    assert_eq!(a.pulls_opened, 2);
    assert_eq!(a.pulls_opened as usize, a.pull_ids.len());
    assert_eq!(a.pulls_merged, 1);

    let b = table.get(B).unwrap();
    assert_eq!((b.approvals, b.changes_requested, b.comments), (1, 1, 0));
    assert_eq!(table.get(C).unwrap().comments, 1);
    assert_eq!(source.review_requests(), 2);
}

fn scenario_pulls() -> Vec<common::PullRequestWithReviews> {
    let day = |n| cutoff() + Duration::days(n);
    vec![
        (pull(1, A, day(1), true), vec![review(B, Approved), review(C, Commented)]),
        (pull(2, B, day(2), false), vec![review(A, ChangesRequested), review(A, Approved)]),
        (pull(3, A, day(3), false), vec![review(A, Commented)]),
        (pull(4, C, day(-1), true), vec![review(D, Approved)]),
        (pull(5, D, day(4), true), vec![review(B, Commented), review(C, Approved)]),
        (pull(6, C, day(5), true), vec![]),
    ]
}

fn source_from(pages: &[&[usize]]) -> FakeSource {
    let all = scenario_pulls();
    let mut source = FakeSource::new();
    for page in pages {
        source = source.page(page.iter().map(|&i| all[i].0.clone()).collect());
    }
    for (pr, reviews) in all {
        source = source.reviews(pr.number, reviews);
    }
    source
}

#[tokio::test]
async fn test_processing_order_does_not_matter() {
    let forward = source_from(&[&[0, 1, 2], &[3, 4, 5]]);
    let reversed = source_from(&[&[5, 4], &[3, 2], &[1, 0]]);
    let overlapping = source_from(&[&[2, 0, 4], &[4, 1, 3, 5], &[0]]);

    let expected = aggregator().run(&forward).await.unwrap().into_snapshot();
    let sequential = aggregator().with_review_concurrency(1);

    assert_eq!(
        aggregator().run(&reversed).await.unwrap().into_snapshot(),
        expected
    );
    assert_eq!(
        sequential.run(&overlapping).await.unwrap().into_snapshot(),
        expected
    );
}

#[tokio::test]
async fn test_table_invariants_hold() {
    let source = source_from(&[&[0, 1, 2, 3, 4, 5], &[1, 4]]);
    let table = aggregator().run(&source).await.unwrap();

    let expected_reviews = [(A, 3), (B, 2), (C, 2), (D, 0)];
    for (id, reviews) in expected_reviews {
        let acc = table.get(id).unwrap();
        assert!(acc.pulls_merged <= acc.pulls_opened);
        assert_eq!(acc.pulls_opened as usize, acc.pull_ids.len());
        assert_eq!(acc.approvals + acc.changes_requested + acc.comments, reviews);
    }

    // Pull 4 predates the cutoff, so D's approval on it is not counted.
    assert_eq!(table.get(D).unwrap().approvals, 0);
    assert_eq!(table.get(C).unwrap().pulls_opened, 1);
}

#[tokio::test]
async fn test_self_reviews_can_be_excluded() {
    let options = RunOptions::new(repo(), cutoff()).self_reviews(SelfReviewPolicy::Exclude);
    let source = source_from(&[&[0, 1, 2, 3, 4, 5]]);

    let table = Aggregator::new(options).run(&source).await.unwrap();

    // A's comment on their own pull 3 is dropped; reviews on B's pull 2 remain.
    let a = table.get(A).unwrap();
    assert_eq!((a.approvals, a.changes_requested, a.comments), (1, 1, 0));
}

#[tokio::test]
async fn test_invalid_options_never_start() {
    let source = FakeSource::new().page(vec![pull(1, A, cutoff() + Duration::days(1), false)]);
    let options = RunOptions::new(repo(), cutoff()).page_size(0);

    let err = Aggregator::new(options).run(&source).await.unwrap_err();

    assert!(matches!(err, StatsError::InvalidOptions(_)));
    assert!(source.page_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_returns_no_table() {
    let source = FakeSource::new().page(vec![pull(1, A, cutoff() + Duration::days(1), false)]);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).unwrap();

    let err = aggregator()
        .run_until_cancelled(&source, cancel_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, StatsError::Cancelled));
}

#[tokio::test]
async fn test_cancel_abandons_in_flight_fetches() {
    let source = FakeSource::new()
        .page(vec![pull(1, A, cutoff() + Duration::days(1), false)])
        .slow_reviews(StdDuration::from_secs(30));
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let _ = cancel_tx.send(true);
    });

    let err = aggregator()
        .run_until_cancelled(&source, cancel_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, StatsError::Cancelled));
}

#[tokio::test]
async fn test_dropped_cancel_sender_lets_run_finish() {
    let source = FakeSource::new().page(vec![pull(1, A, cutoff() + Duration::days(1), false)]);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    drop(cancel_tx);

    let table = aggregator()
        .run_until_cancelled(&source, cancel_rx)
        .await
        .unwrap();

    assert_eq!(table.get(A).unwrap().pulls_opened, 1);
}

#[tokio::test]
async fn test_timeout_reports_cancelled() {
    let source = FakeSource::new()
        .page(vec![pull(1, A, cutoff() + Duration::days(1), false)])
        .slow_reviews(StdDuration::from_secs(30));

    let err = aggregator()
        .run_with_timeout(&source, StdDuration::from_millis(20))
        .await
        .unwrap_err();

    assert!(matches!(err, StatsError::Cancelled));
}
