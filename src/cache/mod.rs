//! # In-Process Cache Module
//!
//! Generic key/value cache with per-entry TTL and a pluggable eviction policy.
//! The coordinator's completed-task history is one instance of it; callers
//! can build their own for memoizing tool or API results.
//!
//! ## Architecture
//!
//! ```text
//! Cache<T> (cheap clone, shared state)
//!   ├── entries: Mutex<HashMap<String, CacheEntry<T>>>   <- single writer at a time
//!   ├── strategy: EvictionStrategy (Lru | Lfu | Fifo | Ttl)
//!   └── sweeper: background task removing expired entries
//! ```
//!
//! ## Design Decisions
//!
//! - **Never fails the caller**: misses and internal problems surface as `None`
//!   or a no-op, with a log line
//! - **Eviction before insertion**: a `set` at capacity removes one entry first,
//!   so `len() <= max_size` always holds
//! - **Stable tie-break**: equal ranking keys evict the earliest inserted entry

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, EvictionStrategy};
pub use store::{Cache, CacheStats};
