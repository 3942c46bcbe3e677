//! Cache entries and eviction ranking.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Cache eviction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently used (last access, falling back to creation time)
    Lru,
    /// Least frequently used (lowest hit count)
    Lfu,
    /// First in, first out (oldest creation time)
    Fifo,
    /// Nearest expiry; entries without expiry rank last
    Ttl,
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Lfu => "lfu",
            EvictionStrategy::Fifo => "fifo",
            EvictionStrategy::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

/// A cached value with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub created_at: Instant,
    pub expires_at: Option<Instant>,
    pub hits: u64,
    pub last_accessed: Option<Instant>,
    pub size_bytes: usize,
    /// Insertion sequence, used to break ranking ties
    pub(crate) sequence: u64,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(
        key: String,
        value: T,
        ttl: Option<Duration>,
        size_bytes: usize,
        sequence: u64,
    ) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            created_at: now,
            // a TTL past the clock's range never expires
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            hits: 0,
            last_accessed: None,
            size_bytes,
            sequence,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.hits = self.hits.saturating_add(1);
        self.last_accessed = Some(now);
    }

    /// Compare two entries by eviction priority; `Less` is evicted first.
    pub(crate) fn eviction_order(&self, other: &Self, strategy: EvictionStrategy) -> Ordering {
        let primary = match strategy {
            EvictionStrategy::Lru => self
                .last_accessed
                .unwrap_or(self.created_at)
                .cmp(&other.last_accessed.unwrap_or(other.created_at)),
            EvictionStrategy::Lfu => self.hits.cmp(&other.hits),
            EvictionStrategy::Fifo => self.created_at.cmp(&other.created_at),
            EvictionStrategy::Ttl => match (self.expires_at, other.expires_at) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then(self.sequence.cmp(&other.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, sequence: u64, ttl: Option<Duration>) -> CacheEntry<u32> {
        CacheEntry::new(key.to_string(), 0, ttl, 0, sequence)
    }

    #[test]
    fn test_ttl_ranks_no_expiry_last() {
        let expiring = entry("a", 2, Some(Duration::from_secs(10)));
        let forever = entry("b", 1, None);

        assert_eq!(
            expiring.eviction_order(&forever, EvictionStrategy::Ttl),
            Ordering::Less
        );
    }

    #[test]
    fn test_ties_break_on_insertion_order() {
        let first = entry("a", 1, None);
        let second = entry("b", 2, None);

        assert_eq!(
            first.eviction_order(&second, EvictionStrategy::Lfu),
            Ordering::Less
        );
        assert_eq!(
            second.eviction_order(&first, EvictionStrategy::Lfu),
            Ordering::Greater
        );
    }

    #[test]
    fn test_expiry_check() {
        let now = Instant::now();
        let mut e = entry("a", 1, Some(Duration::from_millis(5)));
        assert!(!e.is_expired_at(now));
        assert!(e.is_expired_at(now + Duration::from_millis(10)));

        e.expires_at = None;
        assert!(!e.is_expired_at(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let e = entry("a", 1, Some(Duration::MAX));
        assert!(e.expires_at.is_none());
        assert!(!e.is_expired_at(Instant::now() + Duration::from_secs(86_400)));
    }

    #[test]
    fn test_strategy_deserializes_lowercase() {
        let strategy: EvictionStrategy = serde_json::from_str("\"fifo\"").unwrap();
        assert_eq!(strategy, EvictionStrategy::Fifo);
        assert_eq!(EvictionStrategy::Ttl.to_string(), "ttl");
    }
}
