//! Authentication-outcome events.
//!
//! One event per authentication attempt, created once and never mutated.
//! Delivery to the downstream stream is fire-and-forget relative to the
//! request path; consumption of the stream is somebody else's problem.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod publisher;
pub mod redis;

pub use publisher::{EventPublisher, EventSink, PublishOutcome, PublisherMetrics, SinkFuture};
pub use redis::RedisStreamSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure,
}

impl AuthOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthOutcome::Success => "success",
            AuthOutcome::Failure => "failure",
        }
    }
}

/// A single authentication attempt's outcome.
///
/// Event ids are UUIDv7 so the stream stays time-ordered even when entries
/// are re-published out of order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEvent {
    pub id: Uuid,
    pub client_id: i64,
    pub outcome: AuthOutcome,
    pub reason: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

impl AuthEvent {
    #[must_use]
    pub fn success(client_id: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            client_id,
            outcome: AuthOutcome::Success,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn failure(client_id: i64, reason: &'static str) -> Self {
        Self {
            id: Uuid::now_v7(),
            client_id,
            outcome: AuthOutcome::Failure,
            reason: Some(reason),
            timestamp: Utc::now(),
        }
    }
}
