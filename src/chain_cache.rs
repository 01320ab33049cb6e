//! Compiled rule-chain cache with single-flight resolution.
//!
//! The dispatcher asks for a chain on every state-bearing event, so resolving
//! and compiling a definition per event would hammer the repository. The cache
//! keys compiled chains by product id and collapses concurrent misses for the
//! same product into a single repository round-trip: every caller awaits the
//! one in-flight computation instead of racing their own.

use crate::engine::{NodeHandlerFactory, RuleChain, RuleChainDefinition};
use crate::errors::CacheError;
use crate::metrics::MetricsPublisher;
use crate::storage::rule_chain::RuleChainRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

pub struct RuleChainCache<R> {
    repository: R,
    factory: Arc<NodeHandlerFactory>,
    metrics: Arc<dyn MetricsPublisher>,
    /// Per-product cells. A cell left empty by a failed computation is
    /// retried by the next caller; a populated cell never recomputes until
    /// invalidated.
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<RuleChain>>>>>,
}

impl<R: RuleChainRepository> RuleChainCache<R> {
    pub fn new(
        repository: R,
        factory: Arc<NodeHandlerFactory>,
        metrics: Arc<dyn MetricsPublisher>,
    ) -> Self {
        Self {
            repository,
            factory,
            metrics,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Compiled chain for a product, resolving and compiling on first use.
    ///
    /// Concurrent callers for the same product share one resolution. A
    /// product with no chain is [`CacheError::ChainNotBound`]; that outcome
    /// is not cached, so a later binding is picked up.
    pub async fn get_or_compute(&self, product_id: &str) -> Result<Arc<RuleChain>, CacheError> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(product_id.to_string()).or_default().clone()
        };

        if let Some(chain) = cell.get() {
            self.metrics.incr("chain_cache.hit").await;
            return Ok(chain.clone());
        }
        self.metrics.incr("chain_cache.miss").await;

        let chain = cell.get_or_try_init(|| self.compute(product_id)).await?;
        Ok(chain.clone())
    }

    /// Drop the cached chain for a product so the next lookup recompiles.
    pub async fn invalidate(&self, product_id: &str) {
        let removed = self.cells.lock().await.remove(product_id);
        if removed.is_some() {
            debug!(product = %product_id, "Invalidated cached rule chain");
        }
    }

    async fn compute(&self, product_id: &str) -> Result<Arc<RuleChain>, CacheError> {
        let resolution_failed = |details: String| CacheError::ChainResolutionFailed {
            product_id: product_id.to_string(),
            details,
        };

        let chain_id = self
            .repository
            .find_chain_id(product_id)
            .await
            .map_err(|e| resolution_failed(e.to_string()))?
            .ok_or_else(|| CacheError::ChainNotBound {
                product_id: product_id.to_string(),
            })?;

        let document = self
            .repository
            .find_definition(&chain_id)
            .await
            .map_err(|e| resolution_failed(e.to_string()))?
            .ok_or_else(|| {
                resolution_failed(format!("chain {chain_id} is bound but has no definition"))
            })?;

        let definition = RuleChainDefinition::from_json(&document)?;
        let chain = RuleChain::compile(&definition, self.factory.clone())?;

        debug!(product = %product_id, chain = %chain_id, "Compiled rule chain");
        Ok(Arc::new(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::standard_factory;
    use crate::metrics::NoOpMetricsPublisher;
    use crate::transport::NoOpTransport;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DEFINITION: &str = r#"{
        "id": "chain-1",
        "nodes": [
            {"id": "f1", "node_type": "filter", "payload": {">": [{"val": ["temp"]}, 30]}},
            {"id": "a1", "node_type": "log_action"}
        ],
        "edges": [{"from": "f1", "to": "a1", "label": "True"}]
    }"#;

    /// Counts definition fetches and can fail the first N of them.
    struct CountingRepository {
        fetches: AtomicUsize,
        fail_first: usize,
        bound: bool,
    }

    impl CountingRepository {
        fn new(bound: bool, fail_first: usize) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                fail_first,
                bound,
            }
        }
    }

    #[async_trait]
    impl RuleChainRepository for CountingRepository {
        async fn find_chain_id(&self, _product_id: &str) -> Result<Option<String>> {
            Ok(self.bound.then(|| "chain-1".to_string()))
        }

        async fn find_definition(&self, _chain_id: &str) -> Result<Option<String>> {
            let attempt = self.fetches.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                anyhow::bail!("repository unavailable");
            }
            // Yield so concurrent callers pile up behind the in-flight fetch.
            tokio::task::yield_now().await;
            Ok(Some(DEFINITION.to_string()))
        }
    }

    fn cache(repository: Arc<CountingRepository>) -> RuleChainCache<Arc<CountingRepository>> {
        RuleChainCache::new(
            repository,
            Arc::new(standard_factory(Arc::new(NoOpTransport))),
            Arc::new(NoOpMetricsPublisher::new()),
        )
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_resolution() {
        let repository = Arc::new(CountingRepository::new(true, 0));
        let cache = Arc::new(cache(repository.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_compute("p-1").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(repository.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_lookups_hit_cache() {
        let repository = Arc::new(CountingRepository::new(true, 0));
        let cache = cache(repository.clone());

        cache.get_or_compute("p-1").await.unwrap();
        cache.get_or_compute("p-1").await.unwrap();

        assert_eq!(repository.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbound_product_is_an_error_and_not_cached() {
        let repository = Arc::new(CountingRepository::new(false, 0));
        let cache = cache(repository);

        assert!(matches!(
            cache.get_or_compute("p-1").await,
            Err(CacheError::ChainNotBound { .. })
        ));
        // A later binding would be seen: the miss left no cached value.
        assert!(matches!(
            cache.get_or_compute("p-1").await,
            Err(CacheError::ChainNotBound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_resolution_is_retried() {
        let repository = Arc::new(CountingRepository::new(true, 1));
        let cache = cache(repository.clone());

        assert!(cache.get_or_compute("p-1").await.is_err());
        assert!(cache.get_or_compute("p-1").await.is_ok());

        assert_eq!(repository.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let repository = Arc::new(CountingRepository::new(true, 0));
        let cache = cache(repository.clone());

        cache.get_or_compute("p-1").await.unwrap();
        cache.invalidate("p-1").await;
        cache.get_or_compute("p-1").await.unwrap();

        assert_eq!(repository.fetches.load(Ordering::SeqCst), 2);
    }
}
