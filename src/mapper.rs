//! Bounded concurrent mapper
//!
//! Runs one async operation per item with at most `limit` operations in flight.
//! Each operation reports through an [`Outcome`] instead of failing, so one bad
//! package never cancels its siblings. Outcomes are pushed into a shared
//! [`ResultAccumulator`] in completion order and handed back once every started
//! task has finished.

use crate::progress::Progress;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of processing one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<V> {
    /// The item produced a value for the reduction step
    Success(V),
    /// Nothing to record for this item
    Skip,
    /// The item failed; the worker already reported why
    Error(String),
}

impl<V> Outcome<V> {
    /// Returns true for `Error`
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Append-only outcome store shared by concurrent workers
///
/// Many writers, one reader: the reader only calls [`ResultAccumulator::take`]
/// after all writers have been joined.
pub struct ResultAccumulator<V> {
    inner: Arc<Mutex<Vec<Outcome<V>>>>,
}

impl<V> Clone for ResultAccumulator<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for ResultAccumulator<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<V> ResultAccumulator<V> {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome
    pub fn push(&self, outcome: Outcome<V>) {
        // A poisoned lock only means another worker panicked mid-push.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(outcome);
    }

    /// Drain every recorded outcome
    pub fn take(&self) -> Vec<Outcome<V>> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}

/// Cooperative cancellation signal shared between the caller and workers
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl CancelToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns once the flag flips.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Everything the mapper collected for one run
#[derive(Debug)]
pub struct MapReport<V> {
    /// Outcomes returned by the work function, in completion order
    pub outcomes: Vec<Outcome<V>>,
    /// Items that timed out or whose task panicked
    pub failures: Vec<String>,
    /// Items never started because of cancellation
    pub not_started: usize,
    /// Whether cancellation was observed
    pub cancelled: bool,
}

impl<V> MapReport<V> {
    /// Consume the report, keeping only successful values
    pub fn into_successes(self) -> Vec<V> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                Outcome::Success(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Number of skipped items
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Skip))
            .count()
    }

    /// Number of failed items, including timeouts and panics
    pub fn errors(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count() + self.failures.len()
    }

    /// Number of items that finished one way or another
    pub fn completed(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }
}

/// Runs async work over a list of items with bounded concurrency
#[derive(Clone)]
pub struct BoundedMapper {
    limit: usize,
    item_timeout: Option<Duration>,
    progress: Progress,
}

impl BoundedMapper {
    /// Create a mapper allowing `limit` concurrent operations (at least one)
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            item_timeout: None,
            progress: Progress::disabled(),
        }
    }

    /// Abort any single item that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Tick `progress` once per finished item
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Run `work` over every item and wait for all of them
    pub async fn run<T, V, F, Fut>(
        &self,
        items: Vec<T>,
        cancel: &CancelToken,
        work: F,
    ) -> MapReport<V>
    where
        T: fmt::Display + Send + 'static,
        V: Send + 'static,
        F: Fn(T, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        let total = items.len();
        let work = Arc::new(work);
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let accumulator = ResultAccumulator::new();
        let failures: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();
        let mut started = 0usize;
        let mut cancelled = false;

        debug!(total, limit = self.limit, "starting bounded fan-out");

        for item in items {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            started += 1;
            let label = item.to_string();
            let work = Arc::clone(&work);
            let accumulator = accumulator.clone();
            let failures = Arc::clone(&failures);
            let token = cancel.clone();
            let timeout = self.item_timeout;
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let _permit = permit;
                debug!(item = %label, "item started");
                let fut = work(item, token);
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, fut).await {
                        Ok(outcome) => accumulator.push(outcome),
                        Err(_) => {
                            warn!(item = %label, ?limit, "item timed out");
                            record_failure(
                                &failures,
                                format!("{}: timed out after {:?}", label, limit),
                            );
                        }
                    },
                    None => accumulator.push(fut.await),
                }
                progress.inc();
                debug!(item = %label, "item finished");
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "worker task failed");
                record_failure(&failures, format!("worker task failed: {}", e));
                self.progress.inc();
            }
        }

        if !cancelled && cancel.is_cancelled() {
            cancelled = true;
        }

        let failures = {
            let mut guard = failures.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        MapReport {
            outcomes: accumulator.take(),
            failures,
            not_started: total - started,
            cancelled,
        }
    }
}

fn record_failure(failures: &Mutex<Vec<String>>, message: String) {
    failures
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_runs_every_item() {
        let mapper = BoundedMapper::new(4);
        let items: Vec<u32> = (1..=20).collect();

        let report = mapper
            .run(items, &CancelToken::new(), |n, _| async move {
                Outcome::Success(n * 2)
            })
            .await;

        assert_eq!(report.not_started, 0);
        assert!(!report.cancelled);
        let mut values = report.into_successes();
        values.sort();
        assert_eq!(values, (1..=20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));

        let releaser = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                for _ in 0..10 {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    gate.add_permits(1);
                }
            })
        };

        let mapper = BoundedMapper::new(3);
        let report = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            let gate = Arc::clone(&gate);
            mapper
                .run((0..10).collect::<Vec<u32>>(), &CancelToken::new(), move |n, _| {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    let gate = Arc::clone(&gate);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        if let Ok(permit) = gate.acquire().await {
                            permit.forget();
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Outcome::Success(n)
                    }
                })
                .await
        };
        releaser.await.unwrap();

        assert_eq!(report.completed(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_does_not_stop_siblings() {
        let mapper = BoundedMapper::new(2);
        let report = mapper
            .run((0..6).collect::<Vec<u32>>(), &CancelToken::new(), |n, _| async move {
                if n == 2 {
                    Outcome::Error("boom".to_string())
                } else if n == 4 {
                    Outcome::Skip
                } else {
                    Outcome::Success(n)
                }
            })
            .await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.into_successes().len(), 4);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded() {
        let mapper = BoundedMapper::new(2);
        let report = mapper
            .run((0..4).collect::<Vec<u32>>(), &CancelToken::new(), |n, _| async move {
                if n == 1 {
                    panic!("worker exploded");
                }
                Outcome::Success(n)
            })
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.into_successes().len(), 3);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let mapper = BoundedMapper::new(2).with_timeout(Duration::from_millis(20));
        let report = mapper
            .run(vec!["slow", "fast"], &CancelToken::new(), |name, _| async move {
                if name == "slow" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Outcome::Success(name)
            })
            .await;

        assert_eq!(report.into_successes(), vec!["fast"]);
    }

    #[tokio::test]
    async fn test_timeout_message_names_item() {
        let mapper = BoundedMapper::new(1).with_timeout(Duration::from_millis(10));
        let report: MapReport<()> = mapper
            .run(vec!["Serilog"], &CancelToken::new(), |_, _| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Outcome::Skip
            })
            .await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("Serilog: timed out"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicUsize::new(0));

        let report = {
            let calls = Arc::clone(&calls);
            BoundedMapper::new(2)
                .run((0..5).collect::<Vec<u32>>(), &cancel, move |n, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Outcome::Success(n) }
                })
                .await
        };

        assert!(report.cancelled);
        assert_eq!(report.not_started, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_stops_new_items() {
        let cancel = CancelToken::new();
        let mapper = BoundedMapper::new(1);

        let report = mapper
            .run((0..10).collect::<Vec<u32>>(), &cancel, |n, token| async move {
                if n == 2 {
                    token.cancel();
                }
                Outcome::Success(n)
            })
            .await;

        assert!(report.cancelled);
        assert!(report.not_started > 0);
        assert!(report.completed() >= 3);
        assert_eq!(report.completed() + report.not_started, 10);
    }

    #[tokio::test]
    async fn test_in_flight_worker_observes_cancellation() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = BoundedMapper::new(1)
            .run(vec![1u32], &cancel, |_, token| async move {
                tokio::select! {
                    _ = token.cancelled() => Outcome::<u32>::Error("cancelled".to_string()),
                    _ = tokio::time::sleep(Duration::from_secs(5)) => Outcome::Success(1),
                }
            })
            .await;

        assert!(report.cancelled);
        assert_eq!(report.errors(), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_still_runs_items() {
        let report = BoundedMapper::new(0)
            .run(vec![1u32, 2, 3], &CancelToken::new(), |n, _| async move {
                Outcome::Success(n)
            })
            .await;

        assert_eq!(report.completed(), 3);
        assert_eq!(report.not_started, 0);
    }

    #[test]
    fn test_accumulator_shared_between_clones() {
        let acc = ResultAccumulator::new();
        let writer = acc.clone();
        writer.push(Outcome::Success(1));
        writer.push(Outcome::<i32>::Skip);
        assert_eq!(acc.take().len(), 2);
        assert!(acc.take().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_token_resolves() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
