//! Generic TTL cache with pluggable eviction.

use super::entry::{CacheEntry, EvictionStrategy};
use crate::config::CacheConfig;
use crate::constants::system;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    next_sequence: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

struct CacheInner<T> {
    name: String,
    max_size: usize,
    strategy: EvictionStrategy,
    default_ttl: Option<Duration>,
    cleanup_interval: Duration,
    state: Mutex<CacheState<T>>,
}

/// Generic in-process cache.
///
/// Cloning is cheap and clones share entries. Operations are synchronous
/// critical sections; none of them can fail the caller.
pub struct Cache<T> {
    inner: Arc<CacheInner<T>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<T> std::fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("max_size", &self.inner.max_size)
            .field("strategy", &self.inner.strategy)
            .field("default_ttl", &self.inner.default_ttl)
            .field("entries", &self.inner.state.lock().entries.len())
            .finish()
    }
}

impl<T> Cache<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a cache; `default_ttl` of `None` means entries never expire
    /// unless set with an explicit TTL.
    pub fn new(
        name: impl Into<String>,
        max_size: usize,
        strategy: EvictionStrategy,
        default_ttl: Option<Duration>,
    ) -> Self {
        Self::with_sweep_interval(
            name,
            max_size,
            strategy,
            default_ttl,
            Duration::from_secs(system::DEFAULT_CACHE_CLEANUP_INTERVAL_SECONDS),
        )
    }

    /// Create a cache from configuration
    pub fn from_config(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self::with_sweep_interval(
            name,
            config.max_size,
            config.strategy,
            config.default_ttl(),
            config.cleanup_interval(),
        )
    }

    /// Create a cache with an explicit background sweep interval
    pub fn with_sweep_interval(
        name: impl Into<String>,
        max_size: usize,
        strategy: EvictionStrategy,
        default_ttl: Option<Duration>,
        cleanup_interval: Duration,
    ) -> Self {
        let name = name.into();
        debug!(
            cache = %name,
            max_size = max_size,
            strategy = %strategy,
            default_ttl_ms = default_ttl.map(|ttl| ttl.as_millis() as u64),
            "Cache created"
        );

        Self {
            inner: Arc::new(CacheInner {
                name,
                max_size,
                strategy,
                default_ttl,
                cleanup_interval,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    next_sequence: 0,
                    hits: 0,
                    misses: 0,
                    evictions: 0,
                    expirations: 0,
                }),
            }),
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Get a value; expired entries are purged and reported as a miss
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        let expired = match state.entries.get_mut(key) {
            None => {
                state.misses += 1;
                debug!(cache = %self.inner.name, key = key, "Cache MISS");
                return None;
            }
            Some(entry) if entry.is_expired_at(now) => true,
            Some(entry) => {
                entry.touch(now);
                let value = entry.value.clone();
                state.hits += 1;
                debug!(cache = %self.inner.name, key = key, "Cache HIT");
                return Some(value);
            }
        };

        if expired {
            state.entries.remove(key);
            state.expirations += 1;
            state.misses += 1;
            debug!(cache = %self.inner.name, key = key, "Cache entry expired");
        }
        None
    }

    /// Set a value with the default TTL
    pub fn set(&self, key: impl Into<String>, value: T) {
        let ttl = self.inner.default_ttl;
        self.insert(key.into(), value, ttl);
    }

    /// Set a value with an explicit TTL
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        self.insert(key.into(), value, Some(ttl));
    }

    fn insert(&self, key: String, value: T, ttl: Option<Duration>) {
        if self.inner.max_size == 0 {
            debug!(cache = %self.inner.name, key = %key, "Cache disabled (max_size = 0), skipping SET");
            return;
        }

        let size_bytes = estimate_size(&value);
        let mut state = self.inner.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.inner.max_size {
            self.evict_one(&mut state);
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key.clone(),
            CacheEntry::new(key.clone(), value, ttl, size_bytes, sequence),
        );

        debug!(
            cache = %self.inner.name,
            key = %key,
            ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64),
            "Cache SET"
        );
    }

    fn evict_one(&self, state: &mut CacheState<T>) {
        let strategy = self.inner.strategy;
        let victim = state
            .entries
            .values()
            .min_by(|a, b| a.eviction_order(b, strategy))
            .map(|entry| entry.key.clone());

        if let Some(key) = victim {
            state.entries.remove(&key);
            state.evictions += 1;
            debug!(cache = %self.inner.name, key = %key, strategy = %strategy, "Evicted cache key");
        }
    }

    /// Remove one entry; no-op if absent
    pub fn invalidate(&self, key: &str) {
        if self.inner.state.lock().entries.remove(key).is_some() {
            debug!(cache = %self.inner.name, key = key, "Invalidated cache key");
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.inner.state.lock().entries.clear();
        info!(cache = %self.inner.name, "Cache cleared");
    }

    /// Presence check that does not count as an access
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.inner.strategy
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            total_size_bytes: state.entries.values().map(|e| e.size_bytes).sum(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }

    /// Remove every entry whose expiry has passed; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        self.inner.cleanup_expired()
    }

    /// Return the cached value or compute, cache and return it.
    ///
    /// Errors from `producer` are returned as-is and nothing is cached.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = producer().await?;
        match ttl {
            Some(ttl) => self.set_with_ttl(key, value.clone(), ttl),
            None => self.set(key, value.clone()),
        }
        Ok(value)
    }

    /// Start the background sweep of expired entries (idempotent).
    ///
    /// A zero sweep interval disables the sweep; expiry is then lazy only.
    pub fn start(&self) {
        if self.inner.cleanup_interval.is_zero() {
            warn!(cache = %self.inner.name, "Cache sweep interval is zero, not starting maintenance task");
            return;
        }
        let mut sweeper = self.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.cleanup_interval;
        *sweeper = Some(tokio::spawn(sweep_loop(weak, interval)));

        info!(
            cache = %self.inner.name,
            interval_ms = interval.as_millis() as u64,
            "Cache maintenance task started"
        );
    }

    /// Stop the background sweep (idempotent)
    pub fn stop(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            info!(cache = %self.inner.name, "Cache maintenance task stopped");
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> CacheInner<T> {
    fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - state.entries.len();
        state.expirations += removed as u64;
        drop(state);

        if removed > 0 {
            debug!(cache = %self.name, removed = removed, "Cleaned up expired cache entries");
        }
        removed
    }
}

/// Periodic sweep; exits once the cache itself has been dropped.
async fn sweep_loop<T>(cache: Weak<CacheInner<T>>, interval: Duration) {
    loop {
        let Some(inner) = cache.upgrade() else {
            break;
        };

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| inner.cleanup_expired()));
        let name = inner.name.clone();
        drop(inner);

        match outcome {
            Ok(_) => tokio::time::sleep(interval).await,
            Err(_) => {
                error!(cache = %name, "Error in cache cleanup, pausing before retry");
                tokio::time::sleep(Duration::from_secs(
                    system::CACHE_CLEANUP_ERROR_PAUSE_SECONDS,
                ))
                .await;
            }
        }
    }
}

fn estimate_size<T: Serialize>(value: &T) -> usize {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            debug!(error = %e, "Could not estimate cache value size");
            0
        }
    }
}
