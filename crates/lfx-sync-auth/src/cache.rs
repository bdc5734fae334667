//! Coalescing TTL cache.
//!
//! One abstraction backs both process-global caches (tokens and user
//! lookups), parameterized by key, value, refresh policy, and a loader.
//! Concurrent loads for the same key serialize behind a per-key lock so at
//! most one outbound call is in flight; entries between their fresh and
//! usable horizons are served stale while a background refresh runs.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AuthError;

/// Produces a value for a cache key. Implemented by the token signer and
/// the v1 user lookup client.
#[async_trait]
pub trait CacheLoader<K, V>: Send + Sync {
    async fn load(&self, key: &K) -> Result<V, AuthError>;
}

/// Freshness policy for cached entries.
///
/// An entry younger than `fresh_for` is served directly. Between
/// `fresh_for` and `usable_for` it is served stale while a refresh runs in
/// the background. Past `usable_for` the caller waits for a foreground
/// load. Setting both equal disables stale-while-revalidate.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub fresh_for: Duration,
    pub usable_for: Duration,
}

impl CachePolicy {
    /// Tokens live 5 minutes and are refreshed in foreground once within
    /// 30 s of expiry; no stale serving.
    pub fn tokens() -> Self {
        let fresh = Duration::from_secs(300 - 30);
        Self {
            fresh_for: fresh,
            usable_for: fresh,
        }
    }

    /// User lookups: fresh for 10 minutes, usable up to 6 hours with
    /// background refresh.
    pub fn users() -> Self {
        Self {
            fresh_for: Duration::from_secs(10 * 60),
            usable_for: Duration::from_secs(6 * 60 * 60),
        }
    }
}

struct Entry<V> {
    value: V,
    loaded_at: Instant,
}

/// The cache. Shared via `Arc`; background refreshes re-enter through the
/// same per-key locks as foreground loads.
pub struct CoalescingCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    locks: DashMap<K, Arc<Mutex<()>>>,
    policy: CachePolicy,
    loader: Arc<dyn CacheLoader<K, V>>,
}

impl<K, V> CoalescingCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy, loader: Arc<dyn CacheLoader<K, V>>) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            policy,
            loader,
        })
    }

    /// Returns the cached value, loading or refreshing per policy.
    pub async fn get(self: &Arc<Self>, key: &K) -> Result<V, AuthError> {
        if let Some(entry) = self.entries.get(key) {
            let age = entry.loaded_at.elapsed();
            if age < self.policy.fresh_for {
                return Ok(entry.value.clone());
            }
            if age < self.policy.usable_for {
                let stale = entry.value.clone();
                drop(entry);
                self.spawn_refresh(key.clone());
                return Ok(stale);
            }
        }
        self.load_coalesced(key).await
    }

    /// Number of cached entries (for tests and introspection).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_lock(&self, key: &K) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_coalesced(self: &Arc<Self>, key: &K) -> Result<V, AuthError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        // A concurrent caller may have loaded while we waited for the lock.
        if let Some(entry) = self.entries.get(key) {
            if entry.loaded_at.elapsed() < self.policy.fresh_for {
                return Ok(entry.value.clone());
            }
        }

        let value = self.loader.load(key).await?;
        self.entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                loaded_at: Instant::now(),
            },
        );
        Ok(value)
    }

    fn spawn_refresh(self: &Arc<Self>, key: K) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let lock = cache.key_lock(&key);
            // A held lock means a refresh is already in flight; skip.
            let Ok(_guard) = lock.try_lock() else {
                return;
            };

            if let Some(entry) = cache.entries.get(&key) {
                if entry.loaded_at.elapsed() < cache.policy.fresh_for {
                    return;
                }
            }

            match cache.loader.load(&key).await {
                Ok(value) => {
                    cache.entries.insert(
                        key,
                        Entry {
                            value,
                            loaded_at: Instant::now(),
                        },
                    );
                }
                // Stale value stays usable until its horizon; the next get
                // retries the refresh.
                Err(error) => warn!(%error, "background cache refresh failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingLoader {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl CacheLoader<String, usize> for CountingLoader {
        async fn load(&self, _key: &String) -> Result<usize, AuthError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(call)
        }
    }

    fn policy(fresh_ms: u64, usable_ms: u64) -> CachePolicy {
        CachePolicy {
            fresh_for: Duration::from_millis(fresh_ms),
            usable_for: Duration::from_millis(usable_ms),
        }
    }

    #[tokio::test]
    async fn fresh_entry_served_without_reload() {
        let loader = Arc::new(CountingLoader::new(Duration::ZERO));
        let cache = CoalescingCache::new(policy(60_000, 60_000), loader.clone());

        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 1);
        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_load_independently() {
        let loader = Arc::new(CountingLoader::new(Duration::ZERO));
        let cache = CoalescingCache::new(policy(60_000, 60_000), loader.clone());

        cache.get(&"a".to_string()).await.unwrap();
        cache.get(&"b".to_string()).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_gets_coalesce_into_one_load() {
        let loader = Arc::new(CountingLoader::new(Duration::from_millis(50)));
        let cache = CoalescingCache::new(policy(60_000, 60_000), loader.clone());

        let key = "a".to_string();
        let (r1, r2, r3) = tokio::join!(cache.get(&key), cache.get(&key), cache.get(&key));
        assert_eq!(r1.unwrap(), 1);
        assert_eq!(r2.unwrap(), 1);
        assert_eq!(r3.unwrap(), 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_reloads_in_foreground() {
        let loader = Arc::new(CountingLoader::new(Duration::ZERO));
        let cache = CoalescingCache::new(policy(10, 10), loader.clone());

        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 2);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_entry_served_while_refreshing() {
        let loader = Arc::new(CountingLoader::new(Duration::ZERO));
        // fresh 10 ms, usable 10 s: between the two the old value is served
        let cache = CoalescingCache::new(policy(10, 10_000), loader.clone());

        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Stale read returns the old value immediately
        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 1);

        // Give the background refresh time to land, then observe the new value
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get(&"a".to_string()).await.unwrap(), 2);
    }

    struct FailingLoader;

    #[async_trait]
    impl CacheLoader<String, usize> for FailingLoader {
        async fn load(&self, key: &String) -> Result<usize, AuthError> {
            Err(AuthError::UserLookup {
                id: key.clone(),
                reason: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn load_failure_propagates_and_caches_nothing() {
        let cache = CoalescingCache::new(policy(60_000, 60_000), Arc::new(FailingLoader));
        assert!(cache.get(&"a".to_string()).await.is_err());
        assert!(cache.is_empty());
    }
}
