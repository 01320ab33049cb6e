//! Device hub core binary.
//!
//! Wires the dispatcher with in-memory backends and runs until interrupted.
//! Production deployments embed the library and supply their own storage,
//! transport, and session layers.

use devicehub::chain_cache::RuleChainCache;
use devicehub::config::{self, AppConfig};
use devicehub::dispatcher::{DispatcherContext, EventDispatcher};
use devicehub::engine::standard_factory;
use devicehub::event::Event;
use devicehub::identity::{
    CacheConfig, CachingIdentityResolver, IdentityResolver, InMemoryIdentityResolver,
};
use devicehub::metrics::{MetricsPublisher, NoOpMetricsPublisher, StatsdMetricsPublisher};
use devicehub::notify::NoOpSessionBroadcaster;
use devicehub::queue_adapter::{MpscQueueAdapter, QueueAdapter};
use devicehub::shadow::ShadowStore;
use devicehub::storage::memory::{
    InMemoryDeviceRepository, InMemoryEventLog, InMemoryProductRepository,
    InMemoryRuleChainRepository,
};
use devicehub::storage::rule_chain::RuleChainRepository;
use devicehub::tasks::spawn_cancellable_task;
use devicehub::transport::NoOpTransport;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("devicehub {}", config::version());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devicehub=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!(version = config::version(), "Starting device hub core");

    let metrics: Arc<dyn MetricsPublisher> = match &config.statsd_host {
        Some(host) => Arc::new(
            StatsdMetricsPublisher::new(host, "devicehub")
                .map_err(|e| anyhow::anyhow!("Statsd publisher init failed: {e}"))?,
        ),
        None => Arc::new(NoOpMetricsPublisher::new()),
    };

    let base_resolver = Arc::new(InMemoryIdentityResolver::new());
    let identity: Arc<dyn IdentityResolver> = Arc::new(CachingIdentityResolver::with_config(
        base_resolver,
        CacheConfig {
            memory_cache_size: config.identity_cache_size,
            memory_ttl_seconds: config.identity_ttl_seconds,
        },
    ));

    let chain_repository: Arc<dyn RuleChainRepository> =
        Arc::new(InMemoryRuleChainRepository::new());
    let factory = Arc::new(standard_factory(Arc::new(NoOpTransport)));

    let context = DispatcherContext {
        identity,
        shadows: Arc::new(ShadowStore::new(
            config.offline_threshold,
            config.offline_window_seconds,
        )),
        chains: Arc::new(RuleChainCache::new(
            chain_repository,
            factory,
            metrics.clone(),
        )),
        devices: Arc::new(InMemoryDeviceRepository::new()),
        products: Arc::new(InMemoryProductRepository::new()),
        event_log: Arc::new(InMemoryEventLog::new()),
        sessions: Arc::new(NoOpSessionBroadcaster::new()),
        metrics,
    };

    let queue: Arc<dyn QueueAdapter<Event>> = Arc::new(MpscQueueAdapter::new(config.queue_size));
    let dispatcher = EventDispatcher::new(queue, context, config.worker_limit);

    let app_token = CancellationToken::new();
    let tracker = TaskTracker::new();
    spawn_cancellable_task(&tracker, app_token.clone(), {
        let dispatcher = dispatcher.clone();
        move |token| async move { dispatcher.run(token).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    app_token.cancel();
    tracker.close();
    tracker.wait().await;
    dispatcher.shutdown().await;

    info!("Device hub core stopped");
    Ok(())
}
