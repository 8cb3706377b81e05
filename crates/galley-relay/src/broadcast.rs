//! # Update Broadcaster
//!
//! Publishes serialized orders to topic subscribers.
//!
//! ```text
//! OrderUpdateSaga ──publish("orders:branch:B", json)──► Arc<dyn Broadcaster>
//!                                                          │
//!                     ┌────────────────────────────────────┼──────────────┐
//!                     ▼                                    ▼              ▼
//!             ChannelBroadcaster                   RedisBroadcaster   NoOpBroadcaster
//!             (tokio broadcast,                    (PUBLISH)          (tests, disabled)
//!              in-process subscribers)
//! ```

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{RelayError, RelayResult};

/// One message as seen by an in-process subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: String,
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publishes `payload` on `topic` and returns how many subscribers
    /// received it. No subscribers is not an error.
    async fn publish(&self, topic: &str, payload: &str) -> RelayResult<usize>;
}

/// Serializes a value the way every broadcaster expects its payload.
pub fn encode_payload<T: Serialize>(value: &T) -> RelayResult<String> {
    Ok(serde_json::to_string(value)?)
}

// =============================================================================
// In-Process Channel
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<TopicMessage>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        ChannelBroadcaster { tx }
    }

    /// Receives every message from now on, whatever the topic.
    pub fn subscribe(&self) -> broadcast::Receiver<TopicMessage> {
        self.tx.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, topic: &str, payload: &str) -> RelayResult<usize> {
        let message = TopicMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        };
        match self.tx.send(message) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                debug!(topic, "No subscribers for topic");
                Ok(0)
            }
        }
    }
}

// =============================================================================
// Redis Pub/Sub
// =============================================================================

#[derive(Clone)]
pub struct RedisBroadcaster {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisBroadcaster {
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let client = redis::Client::open(url).map_err(|e| RelayError::Broadcast(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RelayError::Broadcast(e.to_string()))?;
        Ok(RedisBroadcaster { conn })
    }
}

#[async_trait]
impl Broadcaster for RedisBroadcaster {
    async fn publish(&self, topic: &str, payload: &str) -> RelayResult<usize> {
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| RelayError::Broadcast(e.to_string()))?;
        Ok(receivers.max(0) as usize)
    }
}

// =============================================================================
// No-op
// =============================================================================

/// Drops every message.
pub struct NoOpBroadcaster;

#[async_trait]
impl Broadcaster for NoOpBroadcaster {
    async fn publish(&self, _topic: &str, _payload: &str) -> RelayResult<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_topic_and_payload() {
        let broadcaster = ChannelBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        let payload = encode_payload(&serde_json::json!({ "id": "o1", "status": "paid" })).unwrap();
        let delivered = broadcaster.publish("orders:branch:B", &payload).await.unwrap();
        assert_eq!(delivered, 1);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic, "orders:branch:B");
        let value: serde_json::Value = serde_json::from_str(&message.payload).unwrap();
        assert_eq!(value["status"], "paid");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let broadcaster = ChannelBroadcaster::new(4);
        assert_eq!(broadcaster.publish("orders:branch:B", "{}").await.unwrap(), 0);
        assert_eq!(NoOpBroadcaster.publish("orders:branch:B", "{}").await.unwrap(), 0);
    }
}
