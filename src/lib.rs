//! Courtside - a cache-aside gateway for sports statistics APIs
//!
//! Fronts slow, rate-limited upstream APIs with a TTL cache, retries on
//! rate limiting, and warms the cache in adaptively sized batches.

pub mod api;
pub mod cache;
pub mod config;
pub mod dvp;
pub mod error;
pub mod fetch;
pub mod models;
pub mod persist;
pub mod prefetch;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::spawn_cleanup_task;
