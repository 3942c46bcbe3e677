mod common;

use arcana_core::Cache;
use common::strategies::*;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Property: the cache never holds more than max_size entries after any set
    #[test]
    fn cache_len_never_exceeds_max_size(
        max_size in 1usize..6,
        strategy in eviction_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
    ) {
        let cache: Cache<u32> = Cache::new("prop", max_size, strategy, None);

        for op in ops {
            match op {
                CacheOp::Set(key, value) => cache.set(key, value),
                CacheOp::SetWithTtl(key, value, ttl_ms) => {
                    cache.set_with_ttl(key, value, Duration::from_millis(ttl_ms))
                }
                CacheOp::Get(key) => {
                    cache.get(&key);
                }
                CacheOp::Invalidate(key) => cache.invalidate(&key),
            }
            prop_assert!(cache.len() <= max_size, "len {} > max {}", cache.len(), max_size);
        }
    }

    /// Property: a value just set is readable while under its TTL
    #[test]
    fn value_just_set_is_readable(
        strategy in eviction_strategy(),
        key in cache_key_strategy(),
        value in any::<u32>(),
    ) {
        let cache: Cache<u32> = Cache::new("prop", 3, strategy, None);
        cache.set(key.clone(), value);
        prop_assert_eq!(cache.get(&key), Some(value));
    }
}
