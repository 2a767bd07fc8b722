//! WebSocket Message Types
//!
//! Messages exchanged between progress viewers and the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messaging::{BatchKind, BatchProgress, BatchResult};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current batch snapshot
    Status,
    /// Ping for keepalive
    Ping,
}

/// Lifecycle of the server's single batch slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    #[default]
    Idle,
    Running,
    Finished,
    Cancelled,
}

/// Latest known state of the batch slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub phase: BatchPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BatchKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub attempted: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSnapshot {
    /// A batch that was just accepted
    pub fn started(kind: BatchKind, total: usize) -> Self {
        Self {
            phase: BatchPhase::Running,
            kind: Some(kind),
            started_at: Some(Utc::now()),
            total,
            ..Default::default()
        }
    }

    /// Builder method: fold in a progress update
    pub fn progress(mut self, progress: BatchProgress) -> Self {
        self.attempted = progress.attempted;
        self.total = progress.total;
        self.succeeded = progress.succeeded;
        self.failed = progress.failed;
        self
    }

    /// Builder method: mark the run as over
    pub fn finish(mut self, result: &BatchResult) -> Self {
        self = self.progress(BatchProgress::from(result));
        self.phase = if result.cancelled {
            BatchPhase::Cancelled
        } else {
            BatchPhase::Finished
        };
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_running(&self) -> bool {
        self.phase == BatchPhase::Running
    }

    /// Completion percentage, rounded
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.attempted as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { connection_id: String },
    /// Current batch state, sent on connect, on request and after each attempt
    Snapshot { snapshot: BatchSnapshot },
    /// One recipient was attempted
    Attempt {
        recipient: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "status"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Status));
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "subscribe"}"#).is_err());
    }

    #[test]
    fn test_snapshot_lifecycle() {
        let snapshot = BatchSnapshot::started(BatchKind::Broadcast, 4).progress(BatchProgress {
            attempted: 1,
            total: 4,
            succeeded: 1,
            failed: 0,
        });
        assert!(snapshot.is_running());
        assert_eq!(snapshot.percent(), 25);

        let done = snapshot.finish(&BatchResult {
            total: 4,
            attempted: 2,
            succeeded: 1,
            failed: 1,
            cancelled: true,
        });
        assert_eq!(done.phase, BatchPhase::Cancelled);
        assert_eq!(done.attempted, 2);
        assert!(done.finished_at.is_some());
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::Attempt {
            recipient: "111111".into(),
            success: false,
            reason: Some("bad number".into()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "attempt");
        assert_eq!(json["reason"], "bad number");

        let json = serde_json::to_string(&ServerMessage::Snapshot {
            snapshot: BatchSnapshot::default(),
        })
        .unwrap();
        assert!(json.contains("\"phase\":\"idle\""));
        assert!(!json.contains("started_at"));
    }
}
