//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's TTL behaviour and key canonicalisation.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKeyBuilder, CacheStore, ManualClock};

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}(:[a-z]{1,8}_[0-9,]{1,12}){0,3}".prop_map(|s| s)
}

fn json_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,32}".prop_map(|s| json!(s)),
        (any::<i32>(), "[a-z]{1,8}").prop_map(|(n, s)| json!({ "n": n, "s": s })),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    Advance { secs: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), json_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..120).prop_map(|secs| CacheOp::Advance { secs }),
    ]
}

fn fresh_store() -> (CacheStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    (CacheStore::with_clock(clock.clone()), clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A value set with TTL t is served for any elapsed time below t and gone at or after t.
    #[test]
    fn prop_ttl_window(
        key in valid_key_strategy(),
        value in json_value_strategy(),
        ttl_secs in 1u64..3_600,
        elapsed_ms in 0u64..7_200_000,
    ) {
        let (mut store, clock) = fresh_store();
        store.set(key.clone(), value.clone(), Duration::from_secs(ttl_secs));

        clock.advance(Duration::from_millis(elapsed_ms));
        let got = store.get(&key);

        if elapsed_ms < ttl_secs * 1000 {
            prop_assert_eq!(got, Some(value));
        } else {
            prop_assert_eq!(got, None);
        }
    }

    // Hit and miss counters match what get() reported.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (mut store, clock) = fresh_store();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, Duration::from_secs(60)),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
                CacheOp::Advance { secs } => clock.advance(Duration::from_secs(secs)),
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // Overwriting a key keeps exactly one entry holding the newest value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        v1 in json_value_strategy(),
        v2 in json_value_strategy(),
    ) {
        let (mut store, _) = fresh_store();
        store.set(key.clone(), v1, Duration::from_secs(60));
        store.set(key.clone(), v2.clone(), Duration::from_secs(60));

        prop_assert_eq!(store.get(&key), Some(v2));
        prop_assert_eq!(store.len(), 1);
    }

    // delete_by_prefix removes exactly the keys that start with the prefix.
    #[test]
    fn prop_delete_by_prefix(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..30),
        prefix in "[a-z_]{1,3}",
    ) {
        let (mut store, _) = fresh_store();
        for key in &keys {
            store.set(key.clone(), json!(1), Duration::from_secs(60));
        }

        let expected = keys.iter().filter(|k| k.starts_with(&prefix)).count();
        prop_assert_eq!(store.delete_by_prefix(&prefix), expected);

        for key in &keys {
            prop_assert_eq!(store.get(key).is_some(), !key.starts_with(&prefix));
        }
    }

    // Id order and duplicates never change the key.
    #[test]
    fn prop_key_ignores_id_order(
        mut ids in prop::collection::vec(-1_000i64..100_000, 0..20),
        season in prop::option::of(2000i32..2030),
        postseason in prop::option::of(any::<bool>()),
    ) {
        let forward = CacheKeyBuilder::new("advanced_stats")
            .ids("players", &ids)
            .scalar("season", season)
            .flag("postseason", postseason)
            .build();

        ids.reverse();
        let mut doubled = ids.clone();
        doubled.extend_from_slice(&ids);

        let reversed = CacheKeyBuilder::new("advanced_stats")
            .flag("postseason", postseason)
            .scalar("season", season)
            .ids("players", &doubled)
            .build();

        prop_assert_eq!(forward, reversed);
    }
}
