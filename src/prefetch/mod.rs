//! Prefetch Module
//!
//! Cache warming over large entity lists without flooding the upstream.

mod adaptive;
mod prefetcher;

pub use adaptive::{AdaptivePolicy, BatchState};
pub use prefetcher::{BatchPrefetcher, BatchRecord, PrefetchOutcome, PrefetchSummary};
