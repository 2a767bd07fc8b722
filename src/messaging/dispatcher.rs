//! Dispatcher
//!
//! Sends one message to one recipient and reduces whatever happens to a
//! `DispatchOutcome`. Nothing past this boundary sees an error.

use std::sync::Arc;

use super::client::GraphClient;
use super::types::{DispatchOutcome, OutboundMessage, Recipient};

/// Single-message sender
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<GraphClient>,
}

impl Dispatcher {
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<GraphClient> {
        &self.client
    }

    /// Validate and send
    ///
    /// Invalid messages fail without any network call.
    pub async fn send(&self, message: &OutboundMessage, recipient: &Recipient) -> DispatchOutcome {
        if let Err(e) = message.validate() {
            tracing::warn!(to = %recipient, reason = %e, "Message rejected before send");
            return DispatchOutcome::failure(e.to_string());
        }

        match self.client.send_message(message, recipient).await {
            Ok(message_id) => {
                tracing::info!(
                    to = %recipient,
                    kind = message.kind(),
                    message_id = %message_id,
                    "Message sent"
                );
                DispatchOutcome::Success {
                    message_id: Some(message_id),
                }
            }
            Err(e) => {
                tracing::warn!(to = %recipient, kind = message.kind(), error = %e, "Message failed");
                DispatchOutcome::failure(e.to_string())
            }
        }
    }
}
