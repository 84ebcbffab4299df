//! Read-through response cache with a per-entry TTL.
#![allow(clippy::future_not_send)]

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;

use super::error::ApiError;

/// Default maximum number of cached responses.
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Read-through cache for decoded API responses.
///
/// On a miss (or an expired entry) `init` is awaited and its `Ok` value
/// stored for `ttl`. Errors are returned to the caller and never cached.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(ResponseCache: Send)]
pub trait LocalResponseCache {
    /// Returns the cached value for `key`, computing it with `init` if absent.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`, shared with any caller that
    /// was waiting on the same key.
    async fn get_or_try_insert_with<F>(
        &self,
        key: String,
        ttl: Duration,
        init: F,
    ) -> Result<Value, Arc<ApiError>>
    where
        F: Future<Output = Result<Value, ApiError>> + Send;
}

/// A cached response and the TTL it was stored with.
#[derive(Debug, Clone)]
struct CachedJson {
    value: Value,
    ttl: Duration,
}

/// Expires each entry after the TTL it was inserted with.
struct PerEntryTtl;

impl Expiry<String, CachedJson> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedJson,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by `moka`.
///
/// Concurrent misses on the same key are coalesced into one `init` call.
#[derive(Clone)]
pub struct MokaResponseCache {
    entries: Cache<String, CachedJson>,
}

impl fmt::Debug for MokaResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaResponseCache")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl Default for MokaResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl MokaResponseCache {
    /// Creates a cache holding at most `capacity` responses.
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl LocalResponseCache for MokaResponseCache {
    async fn get_or_try_insert_with<F>(
        &self,
        key: String,
        ttl: Duration,
        init: F,
    ) -> Result<Value, Arc<ApiError>>
    where
        F: Future<Output = Result<Value, ApiError>> + Send,
    {
        let cached = self
            .entries
            .try_get_with(key, async move {
                init.await.map(|value| CachedJson { value, ttl })
            })
            .await?;
        Ok(cached.value)
    }
}

/// A cache that stores nothing; every lookup runs `init`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCache;

impl LocalResponseCache for PassthroughCache {
    async fn get_or_try_insert_with<F>(
        &self,
        _key: String,
        _ttl: Duration,
        init: F,
    ) -> Result<Value, Arc<ApiError>>
    where
        F: Future<Output = Result<Value, ApiError>> + Send,
    {
        init.await.map_err(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    const LONG_TTL: Duration = Duration::from_secs(60);

    async fn counted(calls: &AtomicUsize, value: Value) -> Result<Value, ApiError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_hit_does_not_recompute() {
        // Arrange
        let cache = MokaResponseCache::default();
        let calls = AtomicUsize::new(0);

        // Act
        let first = cache
            .get_or_try_insert_with(String::from("k"), LONG_TTL, counted(&calls, json!(1)))
            .await
            .unwrap();
        let second = cache
            .get_or_try_insert_with(String::from("k"), LONG_TTL, counted(&calls, json!(2)))
            .await
            .unwrap();

        // Assert
        assert_eq!(first, json!(1));
        assert_eq!(second, json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        // Arrange
        let cache = MokaResponseCache::default();
        let calls = AtomicUsize::new(0);

        // Act
        let a = cache
            .get_or_try_insert_with(String::from("a"), LONG_TTL, counted(&calls, json!("a")))
            .await
            .unwrap();
        let b = cache
            .get_or_try_insert_with(String::from("b"), LONG_TTL, counted(&calls, json!("b")))
            .await
            .unwrap();

        // Assert
        assert_eq!(a, json!("a"));
        assert_eq!(b, json!("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        // Arrange
        let cache = MokaResponseCache::default();
        let calls = AtomicUsize::new(0);

        // Act
        let failed = cache
            .get_or_try_insert_with(String::from("k"), LONG_TTL, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::AuthConfiguration)
            })
            .await;
        let recovered = cache
            .get_or_try_insert_with(String::from("k"), LONG_TTL, counted(&calls, json!(7)))
            .await;

        // Assert
        assert!(matches!(*failed.unwrap_err(), ApiError::AuthConfiguration));
        assert_eq!(recovered.unwrap(), json!(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        // Arrange
        let cache = MokaResponseCache::default();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_millis(50);
        cache
            .get_or_try_insert_with(String::from("k"), ttl, counted(&calls, json!(1)))
            .await
            .unwrap();

        // Act
        tokio::time::sleep(Duration::from_millis(150)).await;
        let refreshed = cache
            .get_or_try_insert_with(String::from("k"), ttl, counted(&calls, json!(2)))
            .await
            .unwrap();

        // Assert
        assert_eq!(refreshed, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_passthrough_always_computes() {
        // Arrange
        let cache = PassthroughCache;
        let calls = AtomicUsize::new(0);

        // Act
        for _ in 0..3 {
            cache
                .get_or_try_insert_with(String::from("k"), LONG_TTL, counted(&calls, json!(1)))
                .await
                .unwrap();
        }

        // Assert
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
