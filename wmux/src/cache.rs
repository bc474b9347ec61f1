//! A TTL cache with an injected clock.
//!
//! The owner constructs the cache with its TTL and clock, so tests can
//! advance time with [`ManualClock`] instead of sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Source of monotonic time for [`TtlCache`].
pub trait Clock: Send + Sync {
    /// Returns the time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Duration,
}

/// A key-value cache whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V, SystemClock> {
    /// Creates a cache backed by the system clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock::new())
    }
}

impl<K, V, C> TtlCache<K, V, C> {
    /// Creates a cache backed by `clock`.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the configured TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash,
    V: Clone,
    C: Clock,
{
    /// Returns the cached value if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Stores a value with the configured TTL.
    pub fn insert(&self, key: K, value: V) {
        let expires_at = self
            .clock
            .now()
            .checked_add(self.ttl)
            .unwrap_or(Duration::MAX);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, Entry { value, expires_at });
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| now < entry.expires_at);
    }

    /// Clears the cache.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    /// Returns the number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert("ETH", 3000u32);
        assert_eq!(cache.get(&"ETH"), Some(3000));

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"ETH"), Some(3000));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"ETH"), None);
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.insert(1, "a");
        clock.advance(Duration::from_secs(5));
        cache.insert(2, "b");
        clock.advance(Duration::from_secs(6));
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("b"));
    }

    #[test]
    fn test_reinsert_refreshes_expiry() {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.insert("k", 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("k", 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&"k"), Some(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(u64::MAX), clock.clone());
        clock.advance(Duration::from_secs(1));
        cache.insert("DOT", 7u32);
        clock.advance(Duration::from_secs(86_400 * 365));
        assert_eq!(cache.get(&"DOT"), Some(7));
    }
}
