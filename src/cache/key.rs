//! Cache Key Module
//!
//! Canonical cache keys built from a namespace and the request parameters
//! that discriminate one upstream result from another.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::{AppError, Result};

// == Cache Key Builder ==
/// Builds `namespace[:name_value]*` keys.
///
/// Segments are ordered by parameter name and id lists are sorted and
/// deduplicated, so two requests for the same data always produce the same
/// key no matter how the caller ordered its inputs.
///
/// ```
/// use courtside::cache::CacheKeyBuilder;
///
/// let key = CacheKeyBuilder::new("advanced_stats")
///     .ids("players", &[5, 3, 3])
///     .scalar("season", None::<i32>)
///     .build();
/// assert_eq!(key, "advanced_stats:players_3,5");
/// ```
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    segments: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            segments: BTreeMap::new(),
        }
    }

    /// Adds a numeric id list. Empty lists add nothing.
    pub fn ids(mut self, name: &str, ids: &[i64]) -> Self {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        if !sorted.is_empty() {
            let joined = sorted
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            self.segments.insert(name.to_string(), joined);
        }
        self
    }

    /// Adds a scalar. `None` and empty renderings add nothing.
    pub fn scalar<T: Display>(mut self, name: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            let rendered = value.to_string();
            if !rendered.is_empty() {
                self.segments.insert(name.to_string(), rendered);
            }
        }
        self
    }

    /// Adds a boolean flag. `Some(false)` is kept as a segment.
    pub fn flag(self, name: &str, value: Option<bool>) -> Self {
        self.scalar(name, value)
    }

    pub fn build(&self) -> String {
        let mut key = self.namespace.clone();
        for (name, value) in &self.segments {
            key.push(':');
            key.push_str(name);
            key.push('_');
            key.push_str(value);
        }
        key
    }
}

/// Parses a comma-separated id list such as `"5,3,3"`.
///
/// Blank tokens are skipped; anything non-numeric is a client error.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| AppError::InvalidRequest(format!("Invalid id '{}'", token)))
        })
        .collect()
}
