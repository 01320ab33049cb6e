//! Device identity resolution with an in-memory caching layer.
//!
//! The base resolver is an external collaborator (typically backed by the
//! hub's token cache). [`CachingIdentityResolver`] wraps any resolver with an
//! LRU + TTL memory cache so the hot path avoids a lookup per event.

use crate::errors::IdentityError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Immutable per-lookup snapshot of a device's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub device_id: String,
    pub device_name: String,
    pub device_type: String,
    pub product_id: String,
    pub org_id: String,
    pub owner: String,
}

/// Maps a device credential token to its identity context.
///
/// A missing identity is a normal operating condition (device not
/// provisioned or not authenticated) and is reported as
/// [`IdentityError::NotFound`] so callers can drop the event silently.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<IdentityContext, IdentityError>;
}

#[async_trait]
impl<T: IdentityResolver + ?Sized> IdentityResolver for Arc<T> {
    async fn resolve(&self, token: &str) -> Result<IdentityContext, IdentityError> {
        (**self).resolve(token).await
    }
}

/// Token table held in memory, for single-instance deployments and tests.
#[derive(Default)]
pub struct InMemoryIdentityResolver {
    tokens: RwLock<std::collections::HashMap<String, IdentityContext>>,
}

impl InMemoryIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, identity: IdentityContext) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(token.into(), identity);
    }

    pub async fn remove(&self, token: &str) {
        let mut tokens = self.tokens.write().await;
        tokens.remove(token);
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<IdentityContext, IdentityError> {
        let tokens = self.tokens.read().await;
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound {
                token: token.to_string(),
            })
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub memory_cache_size: usize,
    pub memory_ttl_seconds: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_cache_size: 1000,
            memory_ttl_seconds: 300,
        }
    }
}

#[derive(Clone)]
struct CachedIdentity {
    identity: IdentityContext,
    cached_at: DateTime<Utc>,
}

impl CachedIdentity {
    fn is_expired(&self, ttl_seconds: i64) -> bool {
        let age = Utc::now() - self.cached_at;
        age > Duration::seconds(ttl_seconds)
    }
}

pub struct CachingIdentityResolver<R>
where
    R: IdentityResolver + 'static,
{
    base_resolver: Arc<R>,
    memory_cache: Arc<RwLock<LruCache<String, CachedIdentity>>>,
    config: CacheConfig,
}

impl<R> CachingIdentityResolver<R>
where
    R: IdentityResolver + 'static,
{
    pub fn new(base_resolver: Arc<R>) -> Self {
        Self::with_config(base_resolver, CacheConfig::default())
    }

    pub fn with_config(base_resolver: Arc<R>, config: CacheConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.memory_cache_size.max(1))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            base_resolver,
            memory_cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            config,
        }
    }
}

#[async_trait]
impl<R> IdentityResolver for CachingIdentityResolver<R>
where
    R: IdentityResolver + Send + Sync + 'static,
{
    async fn resolve(&self, token: &str) -> Result<IdentityContext, IdentityError> {
        {
            let mut cache = self.memory_cache.write().await;
            if let Some(cached) = cache.get(token) {
                if !cached.is_expired(self.config.memory_ttl_seconds) {
                    return Ok(cached.identity.clone());
                }
                cache.pop(token);
            }
        }

        let identity = self.base_resolver.resolve(token).await?;

        let mut cache = self.memory_cache.write().await;
        cache.put(
            token.to_string(),
            CachedIdentity {
                identity: identity.clone(),
                cached_at: Utc::now(),
            },
        );

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        known_token: String,
    }

    impl CountingResolver {
        fn new(known_token: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                known_token: known_token.to_string(),
            }
        }
    }

    #[async_trait]
    impl IdentityResolver for CountingResolver {
        async fn resolve(&self, token: &str) -> Result<IdentityContext, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token == self.known_token {
                Ok(IdentityContext {
                    device_id: "d-1".to_string(),
                    device_name: "sensor-a".to_string(),
                    device_type: "sensor".to_string(),
                    product_id: "p-1".to_string(),
                    org_id: "org-1".to_string(),
                    owner: "alice".to_string(),
                })
            } else {
                Err(IdentityError::NotFound {
                    token: token.to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_base_resolver() {
        let base = Arc::new(CountingResolver::new("tok-1"));
        let resolver = CachingIdentityResolver::new(base.clone());

        let first = resolver.resolve("tok-1").await.unwrap();
        let second = resolver.resolve("tok-1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(base.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let base = Arc::new(CountingResolver::new("tok-1"));
        let resolver = CachingIdentityResolver::new(base.clone());

        assert!(matches!(
            resolver.resolve("unknown").await,
            Err(IdentityError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("unknown").await,
            Err(IdentityError::NotFound { .. })
        ));

        // Both misses hit the base resolver.
        assert_eq!(base.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed() {
        let base = Arc::new(CountingResolver::new("tok-1"));
        let resolver = CachingIdentityResolver::with_config(
            base.clone(),
            CacheConfig {
                memory_cache_size: 10,
                memory_ttl_seconds: 0,
            },
        );

        resolver.resolve("tok-1").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        resolver.resolve("tok-1").await.unwrap();

        assert_eq!(base.calls.load(Ordering::SeqCst), 2);
    }
}
