//! Fetch Module
//!
//! Upstream access, 429 backoff and cache-aside orchestration.

mod orchestrator;
mod retry;
mod upstream;

pub use orchestrator::{FetchOrchestrator, FetchSource, Fetched};
pub use retry::RetryPolicy;
pub use upstream::{HttpUpstream, Upstream, UpstreamError};
