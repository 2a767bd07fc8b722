//! Progress Hub
//!
//! Fans batch events out to WebSocket viewers. The latest snapshot lives in a
//! watch channel so late joiners and the REST status route see the same
//! state; per-attempt events go through a broadcast channel.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use uuid::Uuid;

use super::messages::{BatchSnapshot, ServerMessage};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Configuration for the progress hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capacity of the broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            broadcast_capacity: 256,
        }
    }
}

/// Shared progress state and event fan-out
pub struct ProgressHub {
    /// Active connections: ConnectionId → direct channel
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
    events: broadcast::Sender<ServerMessage>,
    snapshot: watch::Sender<BatchSnapshot>,
    config: HubConfig,
}

impl ProgressHub {
    pub fn new(config: HubConfig) -> Self {
        let (events, _) = broadcast::channel(config.broadcast_capacity);
        let (snapshot, _) = watch::channel(BatchSnapshot::default());

        Self {
            connections: RwLock::new(HashMap::new()),
            events,
            snapshot,
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Fails when the connection limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections);
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(id.clone(), sender);

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        self.connections.write().await.remove(id);
        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Send a message directly to one connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let sender = connections.get(id).ok_or(HubError::ConnectionNotFound)?;
        sender.send(message).map_err(|_| HubError::SendFailed)
    }

    /// Receiver for events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    /// Publish an event to every connection
    ///
    /// Having no listeners is not an error.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.events.send(message);
    }

    /// Replace the snapshot and publish it
    pub fn update(&self, snapshot: BatchSnapshot) {
        self.snapshot.send_replace(snapshot.clone());
        self.publish(ServerMessage::Snapshot { snapshot });
    }

    /// Modify the snapshot in place and publish the result
    pub fn update_with(&self, f: impl FnOnce(BatchSnapshot) -> BatchSnapshot) {
        let next = f(self.snapshot());
        self.update(next);
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Shared handle
pub type SharedHub = Arc<ProgressHub>;

/// Errors from hub operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HubError {
    #[error("Too many WebSocket connections")]
    TooManyConnections,

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::BatchKind;

    #[tokio::test]
    async fn test_register_and_limit() {
        let hub = ProgressHub::new(HubConfig {
            max_connections: 1,
            broadcast_capacity: 8,
        });
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let id = hub.register(tx1).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.register(tx2).await.unwrap_err(), HubError::TooManyConnections);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_send_to() {
        let hub = ProgressHub::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        hub.send_to(&id, ServerMessage::Pong).await.unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::Pong)));
        assert_eq!(
            hub.send_to("missing", ServerMessage::Pong).await.unwrap_err(),
            HubError::ConnectionNotFound
        );
    }

    #[tokio::test]
    async fn test_update_publishes_snapshot() {
        let hub = ProgressHub::default();
        let mut events = hub.subscribe();

        hub.update(BatchSnapshot::started(BatchKind::Campaign, 3));

        assert!(hub.snapshot().is_running());
        match events.recv().await.unwrap() {
            ServerMessage::Snapshot { snapshot } => assert_eq!(snapshot.total, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_listeners() {
        let hub = ProgressHub::default();
        hub.publish(ServerMessage::Pong);
        assert_eq!(hub.snapshot(), BatchSnapshot::default());
    }
}
