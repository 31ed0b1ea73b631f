//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::RetryPolicy;
use crate::prefetch::AdaptivePolicy;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the statistics API
    pub stats_api_base_url: String,
    /// Bearer token for the statistics API
    pub stats_api_key: Option<String>,
    /// Per-request upstream timeout in seconds
    pub upstream_timeout_secs: u64,
    pub retry_max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub prefetch_batch_size: usize,
    pub prefetch_max_batch_size: usize,
    pub prefetch_delay_ms: u64,
    pub prefetch_max_delay_ms: u64,
    /// File backing the persisted cache tier; unset disables the tier
    pub persisted_cache_path: Option<PathBuf>,
    /// Running on a serverless platform (no writable local filesystem)
    pub serverless: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `STATS_API_BASE_URL` - Statistics API base URL
    /// - `STATS_API_KEY` - Statistics API bearer token (optional)
    /// - `UPSTREAM_TIMEOUT_SECS` - Upstream request timeout (default: 15)
    /// - `RETRY_MAX_RETRIES` / `RETRY_BASE_DELAY_MS` / `RETRY_MAX_DELAY_MS`
    /// - `PREFETCH_BATCH_SIZE` / `PREFETCH_MAX_BATCH_SIZE`
    /// - `PREFETCH_DELAY_MS` / `PREFETCH_MAX_DELAY_MS`
    /// - `PERSISTED_CACHE_PATH` - Persisted cache file (default: disabled)
    /// - `VERCEL` or `SERVERLESS` - Marks a serverless runtime
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            stats_api_base_url: non_empty_var("STATS_API_BASE_URL")
                .unwrap_or(defaults.stats_api_base_url),
            stats_api_key: non_empty_var("STATS_API_KEY"),
            upstream_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.upstream_timeout_secs),
            retry_max_retries: parse_var("RETRY_MAX_RETRIES").unwrap_or(defaults.retry_max_retries),
            retry_base_delay_ms: parse_var("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            retry_max_delay_ms: parse_var("RETRY_MAX_DELAY_MS")
                .unwrap_or(defaults.retry_max_delay_ms),
            prefetch_batch_size: parse_var("PREFETCH_BATCH_SIZE")
                .unwrap_or(defaults.prefetch_batch_size),
            prefetch_max_batch_size: parse_var("PREFETCH_MAX_BATCH_SIZE")
                .unwrap_or(defaults.prefetch_max_batch_size),
            prefetch_delay_ms: parse_var("PREFETCH_DELAY_MS").unwrap_or(defaults.prefetch_delay_ms),
            prefetch_max_delay_ms: parse_var("PREFETCH_MAX_DELAY_MS")
                .unwrap_or(defaults.prefetch_max_delay_ms),
            persisted_cache_path: non_empty_var("PERSISTED_CACHE_PATH").map(PathBuf::from),
            serverless: flag_var("VERCEL") || flag_var("SERVERLESS"),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn adaptive_policy(&self) -> AdaptivePolicy {
        let defaults = AdaptivePolicy::default();
        let max_delay = Duration::from_millis(self.prefetch_max_delay_ms);
        AdaptivePolicy {
            initial_batch_size: self.prefetch_batch_size,
            max_batch_size: self.prefetch_max_batch_size,
            initial_delay: Duration::from_millis(self.prefetch_delay_ms),
            min_delay: defaults.min_delay.min(max_delay),
            max_delay,
            ..defaults
        }
    }

    /// Persisted tier location, if the tier can be used in this environment.
    pub fn persisted_cache_enabled(&self) -> Option<&PathBuf> {
        if self.serverless {
            None
        } else {
            self.persisted_cache_path.as_ref()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 60,
            stats_api_base_url: "https://api.balldontlie.io/v1".to_string(),
            stats_api_key: None,
            upstream_timeout_secs: 15,
            retry_max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            prefetch_batch_size: 5,
            prefetch_max_batch_size: 10,
            prefetch_delay_ms: 500,
            prefetch_max_delay_ms: 8_000,
            persisted_cache_path: None,
            serverless: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Set to anything other than empty, `0` or `false`.
fn flag_var(name: &str) -> bool {
    non_empty_var(name)
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}
