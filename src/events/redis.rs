//! Redis Streams sink for authentication events.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;

use super::{AuthEvent, EventSink, SinkFuture};

/// Appends events to a named Redis stream with `XADD`.
///
/// The stream itself is not partitioned; `client_id` rides along as the
/// partition-key field so consumers that shard by client can do so.
#[derive(Clone)]
pub struct RedisStreamSink {
    connection: ConnectionManager,
    stream: String,
}

impl RedisStreamSink {
    /// Connect to Redis and target the given stream.
    ///
    /// # Errors
    /// Returns an error if the Redis URL is invalid or the initial
    /// connection cannot be established.
    pub async fn connect(url: &str, stream: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;
        Ok(Self {
            connection,
            stream: stream.into(),
        })
    }

    #[must_use]
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl EventSink for RedisStreamSink {
    fn publish<'a>(&'a self, event: &'a AuthEvent) -> SinkFuture<'a> {
        Box::pin(async move {
            let mut connection = self.connection.clone();
            let mut cmd = redis::cmd("XADD");
            cmd.arg(&self.stream)
                .arg("*")
                .arg("event_id")
                .arg(event.id.to_string())
                .arg("client_id")
                .arg(event.client_id)
                .arg("outcome")
                .arg(event.outcome.as_str())
                .arg("timestamp")
                .arg(event.timestamp.to_rfc3339());
            if let Some(reason) = event.reason {
                cmd.arg("reason").arg(reason);
            }

            let _entry_id: String = cmd
                .query_async(&mut connection)
                .await
                .context("XADD failed")?;

            Ok(())
        })
    }
}
