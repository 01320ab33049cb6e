//! Event dispatcher: the single consumer of the inbound queue.
//!
//! Each pulled event is resolved to a device identity, then handed to a
//! bounded pool of worker tasks. Per event the dispatcher updates the device
//! shadow, fans telemetry out to UI sessions, and runs the product's rule
//! chain. Events with no resolvable identity are dropped silently; a
//! malformed payload drops the event with a warning. Worker failures never
//! take down the dispatch loop.

use crate::chain_cache::RuleChainCache;
use crate::constants::{STATUS_OFFLINE, STATUS_ONLINE};
use crate::engine::ChainMessage;
use crate::errors::{CacheError, DispatchError, IdentityError};
use crate::event::{Event, EventKind};
use crate::identity::{IdentityContext, IdentityResolver};
use crate::metrics::MetricsPublisher;
use crate::notify::{telemetry_envelope, SessionBroadcaster};
use crate::queue_adapter::QueueAdapter;
use crate::shadow::{DevicePoint, DeviceShadow, PointClass, ShadowStore};
use crate::storage::device::DeviceRepository;
use crate::storage::event_log::{ConnectionEvent, EventLog};
use crate::storage::product::ProductRepository;
use crate::storage::rule_chain::RuleChainRepository;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Collaborators the dispatcher needs per event.
pub struct DispatcherContext {
    pub identity: Arc<dyn IdentityResolver>,
    pub shadows: Arc<ShadowStore>,
    pub chains: Arc<RuleChainCache<Arc<dyn RuleChainRepository>>>,
    pub devices: Arc<dyn DeviceRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub event_log: Arc<dyn EventLog>,
    pub sessions: Arc<dyn SessionBroadcaster>,
    pub metrics: Arc<dyn MetricsPublisher>,
}

/// Queue consumer with bounded-concurrency fan-out.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherContext>,
    queue: Arc<dyn QueueAdapter<Event>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl EventDispatcher {
    pub fn new(
        queue: Arc<dyn QueueAdapter<Event>>,
        context: DispatcherContext,
        worker_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(context),
            queue,
            permits: Arc::new(Semaphore::new(worker_limit.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Enqueue one event for processing.
    pub async fn submit(&self, event: Event) -> Result<(), DispatchError> {
        self.queue
            .push(event)
            .await
            .map_err(|e| DispatchError::SubmitFailed {
                details: e.to_string(),
            })
    }

    /// Process one event to completion on the caller's task.
    ///
    /// The queue-driven workers use this same path; it is public so embedders
    /// can bypass the queue when they need synchronous semantics.
    pub async fn process_event(&self, event: Event) {
        self.inner.handle_event(event).await;
    }

    /// Consume the queue until cancellation or queue closure.
    ///
    /// Each event is handled on its own worker task, gated by the worker
    /// semaphore so no more than `worker_limit` events are in flight.
    pub async fn run(&self, cancel_token: CancellationToken) -> anyhow::Result<()> {
        info!("Event dispatcher started");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Event dispatcher stopping on shutdown signal");
                    break;
                }
                maybe_event = self.queue.pull() => {
                    let Some(event) = maybe_event else {
                        info!("Event queue closed, dispatcher stopping");
                        break;
                    };
                    self.inner.metrics.incr("dispatcher.events.received").await;

                    let permit = match self.permits.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            error!(error = ?e, "Worker semaphore closed unexpectedly");
                            break;
                        }
                    };

                    let inner = self.inner.clone();
                    self.tracker.spawn(async move {
                        inner.handle_event(event).await;
                        drop(permit);
                    });
                }
            }
        }

        Ok(())
    }

    /// Graceful drain: wait for every in-flight worker to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        info!("Event dispatcher drained");
    }
}

impl DispatcherContext {
    async fn handle_event(&self, event: Event) {
        let identity = match self.identity.resolve(&event.token).await {
            Ok(identity) => identity,
            Err(IdentityError::NotFound { .. }) => {
                // Unprovisioned or unauthenticated device: not an error.
                debug!(kind = %event.kind, "Dropping event with unresolvable token");
                self.metrics.incr("dispatcher.events.dropped.unknown_device").await;
                return;
            }
            Err(e) => {
                warn!(kind = %event.kind, error = ?e, "Identity resolution failed, dropping event");
                self.metrics.incr("dispatcher.events.dropped.resolution_failed").await;
                return;
            }
        };

        match event.kind {
            EventKind::Connect => self.handle_connect(&identity, &event).await,
            EventKind::Disconnect => self.handle_disconnect(&identity, &event).await,
            _ => self.handle_data(&identity, &event).await,
        }
    }

    /// Telemetry, attributes, raw, and RPC events.
    async fn handle_data(&self, identity: &IdentityContext, event: &Event) {
        let fields = match event.decode_payload() {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    device = %identity.device_name,
                    kind = %event.kind,
                    error = ?e,
                    "Dropping event with undecodable payload"
                );
                self.metrics.incr("dispatcher.events.dropped.decode_failed").await;
                return;
            }
        };
        let data = Value::Object(fields.clone());

        if event.kind == EventKind::Telemetry {
            // Fire-and-forget: UI fan-out never delays or fails dispatch.
            let sessions = self.sessions.clone();
            let device_id = identity.device_id.clone();
            let envelope = telemetry_envelope(&data);
            tokio::spawn(async move {
                if let Err(e) = sessions.broadcast(&device_id, &envelope).await {
                    debug!(device = %device_id, error = ?e, "Session broadcast failed");
                }
            });
        }

        if let Some(class) = event.kind.point_class() {
            self.update_shadow(identity, class, &fields).await;
        }

        match self.chains.get_or_compute(&identity.product_id).await {
            Ok(chain) => {
                let message = ChainMessage::new(identity, event.kind, data);
                if let Err(e) = chain.execute(message).await {
                    warn!(
                        device = %identity.device_name,
                        chain = %chain.id(),
                        error = ?e,
                        "Rule chain execution failed"
                    );
                    self.metrics.incr("dispatcher.chain.failed").await;
                }
            }
            Err(CacheError::ChainNotBound { .. }) => {
                // Products without automation are normal; nothing to run.
                debug!(product = %identity.product_id, "No rule chain for product");
            }
            Err(e) => {
                warn!(
                    product = %identity.product_id,
                    error = ?e,
                    "Rule chain resolution failed"
                );
                self.metrics.incr("dispatcher.chain.resolution_failed").await;
            }
        }
    }

    /// Fold decoded fields into the shadow, keeping only fields the product
    /// template declares for this point class.
    async fn update_shadow(
        &self,
        identity: &IdentityContext,
        class: PointClass,
        fields: &Map<String, Value>,
    ) {
        let templates = match self
            .products
            .find_templates(&identity.product_id, class.as_str())
            .await
        {
            Ok(templates) => templates,
            Err(e) => {
                warn!(product = %identity.product_id, error = ?e, "Template lookup failed");
                return;
            }
        };

        let now = Utc::now();
        for template in templates {
            let Some(value) = fields.get(&template.key) else {
                continue;
            };
            let point = DevicePoint {
                name: template.key.clone(),
                title: template.title.clone(),
                value: value.clone(),
                unit: template.unit.clone(),
                updated_at: now,
            };
            if let Err(e) = self.shadows.set_point(&identity.device_name, class, point).await {
                // No shadow yet means the device never connected this run.
                debug!(device = %identity.device_name, error = ?e, "Shadow update skipped");
                break;
            }
        }
    }

    async fn handle_connect(&self, identity: &IdentityContext, event: &Event) {
        let product_name = match self.products.find_one(&identity.product_id).await {
            Ok(Some(product)) => product.name,
            Ok(None) => identity.product_id.clone(),
            Err(e) => {
                warn!(product = %identity.product_id, error = ?e, "Product lookup failed");
                identity.product_id.clone()
            }
        };

        self.shadows
            .add_device(DeviceShadow::new(identity.device_name.clone(), product_name))
            .await;
        if let Err(e) = self.shadows.set_online(&identity.device_name).await {
            warn!(device = %identity.device_name, error = ?e, "Shadow online transition failed");
        }

        if let Err(e) = self
            .devices
            .update_status(&identity.device_id, STATUS_ONLINE)
            .await
        {
            warn!(device = %identity.device_name, error = ?e, "Device status update failed");
        }
        self.record_connection(identity, STATUS_ONLINE, event).await;
        self.metrics.incr("dispatcher.device.online").await;
    }

    /// Every disconnect persists the offline status and a history record;
    /// only the shadow's online flag is debounced.
    async fn handle_disconnect(&self, identity: &IdentityContext, event: &Event) {
        match self.shadows.set_offline(&identity.device_name).await {
            Ok(true) => {
                debug!(device = %identity.device_name, "Device transitioned offline");
                self.metrics.incr("dispatcher.device.offline").await;
            }
            Ok(false) => {
                debug!(device = %identity.device_name, "Disconnect debounced, shadow stays online");
                self.metrics.incr("dispatcher.device.disconnect_debounced").await;
            }
            Err(e) => {
                warn!(device = %identity.device_name, error = ?e, "Shadow offline transition failed");
            }
        }

        if let Err(e) = self
            .devices
            .update_status(&identity.device_id, STATUS_OFFLINE)
            .await
        {
            warn!(device = %identity.device_name, error = ?e, "Device status update failed");
        }
        self.record_connection(identity, STATUS_OFFLINE, event).await;
    }

    async fn record_connection(&self, identity: &IdentityContext, status: &str, event: &Event) {
        let record = ConnectionEvent {
            device_id: identity.device_id.clone(),
            device_name: identity.device_name.clone(),
            status: status.to_string(),
            content: event.payload.clone(),
            occurred_at: event.received_at,
        };
        if let Err(e) = self.event_log.insert_event(record).await {
            warn!(device = %identity.device_name, error = ?e, "Connection event log failed");
        }
    }
}
