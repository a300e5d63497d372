//! Bounded, fire-and-forget event publication.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::AuthEvent;

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Destination for authentication events. Implementations may suspend on
/// backpressure; the publisher bounds how long the caller will wait.
pub trait EventSink: Send + Sync {
    fn publish<'a>(&'a self, event: &'a AuthEvent) -> SinkFuture<'a>;
}

/// Delivery counters. Failed publishes are never silently dropped: every
/// degraded delivery shows up here and in the logs.
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl PublisherMetrics {
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    Degraded,
}

/// Publishes events with a bounded timeout and degrade-to-log behavior.
///
/// The authentication response never blocks on stream acknowledgment beyond
/// the configured timeout, and a failed publish never fails the request.
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
    publish_timeout: Duration,
    metrics: Arc<PublisherMetrics>,
}

impl EventPublisher {
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, publish_timeout: Duration) -> Self {
        Self {
            sink,
            publish_timeout,
            metrics: Arc::new(PublisherMetrics::default()),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<PublisherMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn publish(&self, event: AuthEvent) -> PublishOutcome {
        match timeout(self.publish_timeout, self.sink.publish(&event)).await {
            Ok(Ok(())) => {
                self.metrics.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_id = %event.id,
                    client_id = event.client_id,
                    outcome = event.outcome.as_str(),
                    "auth event published"
                );
                PublishOutcome::Delivered
            }
            Ok(Err(err)) => {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_id = %event.id,
                    client_id = event.client_id,
                    "auth event publish failed: {err:#}"
                );
                PublishOutcome::Degraded
            }
            Err(_) => {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_id = %event.id,
                    client_id = event.client_id,
                    timeout_ms = self.publish_timeout.as_millis() as u64,
                    "auth event publish timed out"
                );
                PublishOutcome::Degraded
            }
        }
    }
}
