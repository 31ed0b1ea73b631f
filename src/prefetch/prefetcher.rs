//! Batch Prefetcher
//!
//! Runs an async operation over a list of items in sequential batches. Items
//! inside a batch run concurrently and every one of them is awaited, so one
//! failure never cancels its siblings.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{AdaptivePolicy, BatchState};

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub size: usize,
    pub failed: usize,
    pub failure_rate: f64,
    /// State applied to the batch that follows
    pub next: BatchState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub batches: Vec<BatchRecord>,
}

#[derive(Debug)]
pub struct PrefetchOutcome<T, V> {
    pub results: Vec<(T, V)>,
    pub failures: Vec<(T, String)>,
    pub summary: PrefetchSummary,
}

// == Batch Prefetcher ==
#[derive(Debug, Clone)]
pub struct BatchPrefetcher {
    policy: AdaptivePolicy,
}

impl BatchPrefetcher {
    pub fn new(policy: AdaptivePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdaptivePolicy {
        &self.policy
    }

    /// Runs `op` for every item and reports per-item results.
    ///
    /// Always runs to the end of `items`.
    pub async fn run<T, V, E, F, Fut>(&self, items: Vec<T>, op: F) -> PrefetchOutcome<T, V>
    where
        T: Clone + Display,
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let started = Instant::now();
        let total = items.len();
        let mut state = self.policy.initial_state();
        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut batches = Vec::new();
        let mut remaining = items.into_iter().peekable();

        info!(total, batch_size = state.batch_size, "prefetch started");

        while remaining.peek().is_some() {
            let batch: Vec<T> = remaining.by_ref().take(state.batch_size.max(1)).collect();
            let size = batch.len();

            let settled = join_all(batch.into_iter().map(|item| {
                let fut = op(item.clone());
                async move { (item, fut.await) }
            }))
            .await;

            let mut failed = 0;
            for (item, result) in settled {
                match result {
                    Ok(value) => results.push((item, value)),
                    Err(e) => {
                        failed += 1;
                        debug!(%item, error = %e, "prefetch item failed");
                        failures.push((item, e.to_string()));
                    }
                }
            }

            let failure_rate = failed as f64 / size as f64;
            state = self.policy.adjust(state, failure_rate);
            if failure_rate > self.policy.high_water {
                warn!(
                    failed,
                    size,
                    next_batch_size = state.batch_size,
                    next_delay_ms = state.delay.as_millis() as u64,
                    "prefetch batch mostly failed, backing off"
                );
            }

            batches.push(BatchRecord {
                size,
                failed,
                failure_rate,
                next: state,
            });

            if remaining.peek().is_some() {
                tokio::time::sleep(state.delay).await;
            }
        }

        let summary = PrefetchSummary {
            total,
            succeeded: results.len(),
            failed: failures.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            batches,
        };
        info!(
            total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            batches = summary.batches.len(),
            "prefetch finished"
        );

        PrefetchOutcome {
            results,
            failures,
            summary,
        }
    }
}
