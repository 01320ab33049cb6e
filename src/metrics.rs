//! Operational metrics publishing.
//!
//! The dispatcher and caches count events, drops, and cache traffic through
//! [`MetricsPublisher`]. The statsd implementation ships over UDP via
//! cadence; deployments without a collector get the no-op publisher.

use async_trait::async_trait;
use cadence::{
    BufferedUdpMetricSink, Counted, CountedExt, Gauged, QueuingMetricSink, StatsdClient, Timed,
};
use std::net::UdpSocket;
use tracing::{debug, error};

/// Counter, gauge, and timing emission behind one async trait.
#[async_trait]
pub trait MetricsPublisher: Send + Sync {
    /// Increment a counter by 1.
    async fn incr(&self, key: &str);

    /// Increment a counter by a specific value.
    async fn count(&self, key: &str, value: u64);

    /// Record a gauge value.
    async fn gauge(&self, key: &str, value: u64);

    /// Record a timing in milliseconds.
    async fn time(&self, key: &str, millis: u64);
}

/// Publisher that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoOpMetricsPublisher;

impl NoOpMetricsPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsPublisher for NoOpMetricsPublisher {
    async fn incr(&self, _key: &str) {}
    async fn count(&self, _key: &str, _value: u64) {}
    async fn gauge(&self, _key: &str, _value: u64) {}
    async fn time(&self, _key: &str, _millis: u64) {}
}

/// Statsd publisher over a non-blocking, queued UDP sink.
///
/// Emission failures are logged at debug and never surfaced: metrics must
/// not interfere with event processing.
pub struct StatsdMetricsPublisher {
    client: StatsdClient,
}

impl StatsdMetricsPublisher {
    pub fn new(host: &str, prefix: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Self::new_with_bind(host, prefix, "[::]:0")
    }

    pub fn new_with_bind(
        host: &str,
        prefix: &str,
        bind_addr: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        let buffered_sink = BufferedUdpMetricSink::from(host, socket)?;
        let queuing_sink = QueuingMetricSink::builder()
            .with_error_handler(move |error| {
                error!("Failed to send metric via sink: {}", error);
            })
            .build(buffered_sink);
        let client = StatsdClient::from_sink(prefix, queuing_sink);

        debug!(host = %host, prefix = %prefix, "Statsd metrics publisher created");
        Ok(Self { client })
    }
}

#[async_trait]
impl MetricsPublisher for StatsdMetricsPublisher {
    async fn incr(&self, key: &str) {
        if let Err(e) = self.client.incr(key) {
            debug!(key = %key, error = %e, "Failed to increment counter");
        }
    }

    async fn count(&self, key: &str, value: u64) {
        if let Err(e) = self.client.count(key, value as i64) {
            debug!(key = %key, error = %e, "Failed to count");
        }
    }

    async fn gauge(&self, key: &str, value: u64) {
        if let Err(e) = self.client.gauge(key, value) {
            debug!(key = %key, error = %e, "Failed to record gauge");
        }
    }

    async fn time(&self, key: &str, millis: u64) {
        if let Err(e) = self.client.time(key, millis) {
            debug!(key = %key, error = %e, "Failed to record timing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_publisher_accepts_everything() {
        let publisher = NoOpMetricsPublisher::new();
        publisher.incr("events.received").await;
        publisher.count("events.dropped", 3).await;
        publisher.gauge("queue.depth", 12).await;
        publisher.time("chain.execute", 4).await;
    }
}
