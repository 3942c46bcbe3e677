//! Proptest strategies

use arcana_core::EvictionStrategy;
use proptest::prelude::*;

/// One cache operation
#[derive(Debug, Clone)]
pub enum CacheOp {
    Set(String, u32),
    SetWithTtl(String, u32, u64),
    Get(String),
    Invalidate(String),
}

/// Small key space so operations collide and overwrite
pub fn cache_key_strategy() -> impl Strategy<Value = String> {
    "[a-h]".prop_map(|s| s.to_string())
}

pub fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (cache_key_strategy(), any::<u32>()).prop_map(|(k, v)| CacheOp::Set(k, v)),
        2 => (cache_key_strategy(), any::<u32>(), 1u64..5_000)
            .prop_map(|(k, v, ttl)| CacheOp::SetWithTtl(k, v, ttl)),
        3 => cache_key_strategy().prop_map(CacheOp::Get),
        1 => cache_key_strategy().prop_map(CacheOp::Invalidate),
    ]
}

pub fn eviction_strategy() -> impl Strategy<Value = EvictionStrategy> {
    prop_oneof![
        Just(EvictionStrategy::Lru),
        Just(EvictionStrategy::Lfu),
        Just(EvictionStrategy::Fifo),
        Just(EvictionStrategy::Ttl),
    ]
}
