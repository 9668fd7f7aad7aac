use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formpilot::error::FormError;
use formpilot::jobs::{InMemoryJobQueue, JobQueue, JobStatus, PoolOptions, PoolSummary, run_pool};

fn once(workers: usize) -> PoolOptions {
    PoolOptions { workers, poll_interval: Duration::ZERO, once: true }
}

// =========================================================================
// Queue
// =========================================================================

#[test]
fn in_memory_queue_is_fifo() {
    let queue = InMemoryJobQueue::new(["https://a.example.com/1"]);
    queue.push("https://a.example.com/2");
    assert_eq!(queue.pending(), 2);

    assert_eq!(queue.next_job().expect("in memory").as_deref(), Some("https://a.example.com/1"));
    assert_eq!(queue.next_job().expect("in memory").as_deref(), Some("https://a.example.com/2"));
    assert_eq!(queue.next_job().expect("in memory"), None, "An empty queue has no next job");

    queue.report("https://a.example.com/1", false).expect("in memory");
    assert_eq!(queue.results(), vec![("https://a.example.com/1".to_string(), JobStatus::Failed)]);
}

#[test]
fn job_status_wire_names() {
    assert_eq!(serde_json::to_string(&JobStatus::Success).expect("serializes"), "\"success\"");
    assert_eq!(serde_json::to_string(&JobStatus::from(false)).expect("serializes"), "\"failed\"");
}

// =========================================================================
// Pool
// =========================================================================

#[test]
fn pool_drains_queue_and_counts_results() {
    let queue = InMemoryJobQueue::new([
        "https://jobs.example.com/1",
        "https://jobs.example.com/closed",
        "https://jobs.example.com/3",
    ]);
    let runs = AtomicUsize::new(0);

    let summary = run_pool(&queue, &once(2), |url| {
        runs.fetch_add(1, Ordering::SeqCst);
        if url.contains("closed") {
            return Err(FormError::DeadEnd("posting closed".to_string()));
        }
        Ok(())
    });

    assert_eq!(summary, PoolSummary { succeeded: 2, failed: 1 });
    assert_eq!(runs.load(Ordering::SeqCst), 3, "Every job runs exactly once");
    assert_eq!(queue.pending(), 0);

    let results = queue.results();
    assert_eq!(results.len(), 3);
    let failed: Vec<&str> = results.iter().filter(|(_, s)| *s == JobStatus::Failed).map(|(u, _)| u.as_str()).collect();
    assert_eq!(failed, vec!["https://jobs.example.com/closed"]);
}

#[test]
fn pool_on_empty_queue_stops_at_once() {
    let queue = InMemoryJobQueue::default();
    let summary = run_pool(&queue, &once(3), |_| Ok(()));
    assert_eq!(summary, PoolSummary::default());
    assert!(queue.results().is_empty());
}

#[test]
fn zero_workers_still_runs_one() {
    let queue = InMemoryJobQueue::new(["https://jobs.example.com/1"]);
    let summary = run_pool(&queue, &once(0), |_| Ok(()));
    assert_eq!(summary.succeeded, 1);
}
