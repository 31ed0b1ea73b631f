//! Cache Module
//!
//! In-memory TTL cache, its time source, TTL classes and key composition.

mod clock;
mod entry;
mod key;
mod stats;
mod store;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{parse_id_list, CacheKeyBuilder};
pub use stats::CacheStats;
pub use store::{CacheStore, SharedCache};
pub use ttl::TtlClass;
