//! Batched worker pool
//!
//! This module runs one operation over many work items:
//! - items are split into consecutive chunks of `batch_size`
//! - inside a chunk, a semaphore limits how many workers run at once
//! - a chunk is fully drained before the next one is spawned
//! - results are consumed in completion order
//! - a failing or panicking worker never stops its siblings

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Shape of a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Items per chunk (at least 1)
    pub batch_size: usize,

    /// Workers running at once (at least 1)
    pub concurrency: usize,

    /// Label used in progress messages
    pub label: String,
}

impl BatchOptions {
    pub fn new(batch_size: usize, concurrency: usize, label: impl Into<String>) -> Self {
        Self {
            batch_size,
            concurrency,
            label: label.into(),
        }
    }
}

/// Completion counter for one batch run
#[derive(Debug)]
pub struct Progress {
    label: String,
    total: usize,
    done: usize,
    step: usize,
}

impl Progress {
    pub fn new(label: &str, total: usize) -> Self {
        Self {
            label: label.to_string(),
            total,
            done: 0,
            step: (total / 20).max(1),
        }
    }

    /// Records one finished item, logging every 5% and at the end
    pub fn advance(&mut self) -> usize {
        self.done += 1;
        if self.done % self.step == 0 || self.done == self.total {
            tracing::info!(
                "{}: {}/{} ({:.0}%)",
                self.label,
                self.done,
                self.total,
                self.done as f64 * 100.0 / self.total.max(1) as f64
            );
        }
        self.done
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Runs `extract` once for every item and returns how many succeeded
///
/// A worker succeeds when it returns `Ok(true)`. `Ok(false)` is a quiet skip
/// (the worker logged its own reason), `Err(_)` is logged here, and a panic is
/// caught through the task's join handle and counted as a failure.
///
/// At most `batch_size` items are outstanding at any time and at most
/// `concurrency` of them are running.
///
/// # Example
///
/// ```no_run
/// use law_crawler::crawler::{run_batches, BatchOptions};
///
/// # async fn example() {
/// let items: Vec<u32> = (1..=10).collect();
/// let succeeded = run_batches(
///     items,
///     |n| async move { Ok::<_, String>(n % 2 == 1) },
///     &BatchOptions::new(4, 2, "Odd numbers"),
/// )
/// .await;
/// assert_eq!(succeeded, 5);
/// # }
/// ```
pub async fn run_batches<T, E, F, Fut>(items: Vec<T>, extract: F, options: &BatchOptions) -> usize
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
{
    let batch_size = options.batch_size.max(1);
    let extract = Arc::new(extract);
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut progress = Progress::new(&options.label, items.len());
    let mut succeeded = 0;

    let mut remaining = items.into_iter().peekable();
    let mut batch_number = 0;

    while remaining.peek().is_some() {
        batch_number += 1;
        let mut workers = JoinSet::new();

        for item in remaining.by_ref().take(batch_size) {
            let extract = Arc::clone(&extract);
            let permits = Arc::clone(&permits);
            workers.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = permits.acquire_owned().await.ok();
                (*extract)(item).await
            });
        }

        tracing::debug!(
            batch = batch_number,
            size = workers.len(),
            "{}: batch started",
            options.label
        );

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(true)) => succeeded += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Error processing item"),
                Err(e) if e.is_panic() => tracing::error!(error = %e, "Worker panicked"),
                Err(e) => tracing::error!(error = %e, "Worker did not finish"),
            }
            progress.advance();
        }
    }

    succeeded
}
