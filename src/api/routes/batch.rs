//! Batch Routes
//!
//! Broadcasts and campaigns run in a background task; only one batch may be
//! in flight at a time.
//!
//! - POST /api/v1/broadcast - Send to a pasted number list
//! - POST /api/v1/campaigns - Send to leads with a given status
//! - GET /api/v1/batch - Current batch snapshot
//! - POST /api/v1/batch/cancel - Stop the running batch between attempts

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{BatchStarted, BroadcastRequest, CampaignRequest, CancelResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::ledger::{LedgerReporter, StatusFilter};
use crate::messaging::{
    parse_recipient_list, BatchError, BatchKind, BatchProgress, BatchReporter, BatchResult,
    ComposeRequest, Composer, MessageKind, OutboundMessage, Recipient,
};
use crate::websocket::{BatchSnapshot, ProgressHub, ServerMessage};

/// POST /api/v1/broadcast
pub async fn start_broadcast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<(StatusCode, Json<BatchStarted>)> {
    let message = compose(&state, &req.message).await?;
    let recipients = parse_recipient_list(&req.numbers);
    start(state, BatchKind::Broadcast, message, recipients)
}

/// POST /api/v1/campaigns
pub async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CampaignRequest>,
) -> ApiResult<(StatusCode, Json<BatchStarted>)> {
    let filter: StatusFilter = req.status.parse().map_err(ApiError::Validation)?;
    let message = compose(&state, &req.message).await?;
    let recipients = state
        .ledger
        .read(|ledger| ledger.campaign_recipients(filter))
        .await;
    start(state, BatchKind::Campaign, message, recipients)
}

/// GET /api/v1/batch
pub async fn batch_status(State(state): State<Arc<AppState>>) -> Json<BatchSnapshot> {
    Json(state.hub.snapshot())
}

/// POST /api/v1/batch/cancel
///
/// `cancelled` is false when no batch was running.
pub async fn cancel_batch(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    let cancelled = state.batch.cancel();
    if cancelled {
        tracing::info!("Batch cancellation requested");
    }
    Json(CancelResponse { cancelled })
}

/// Compose and reject invalid messages before anything is queued
async fn compose(state: &AppState, req: &ComposeRequest) -> ApiResult<OutboundMessage> {
    let catalog = match req.kind {
        MessageKind::Template => state.catalog().await,
        MessageKind::Text => Vec::new(),
    };
    let message = Composer::new(&catalog).compose(req);
    message
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(message)
}

fn start(
    state: Arc<AppState>,
    kind: BatchKind,
    message: OutboundMessage,
    recipients: Vec<Recipient>,
) -> ApiResult<(StatusCode, Json<BatchStarted>)> {
    if recipients.is_empty() {
        return Err(BatchError::NoRecipients.into());
    }

    let lease = state
        .batch
        .try_start()
        .ok_or_else(|| ApiError::Conflict("a batch is already running".to_string()))?;

    let total = recipients.len();
    state.hub.update(BatchSnapshot::started(kind, total));
    tracing::info!(kind = %kind, total, "Batch accepted");

    tokio::spawn(async move {
        let reporter = ServerReporter {
            ledger: LedgerReporter::new(Arc::clone(&state.ledger), kind),
            hub: Arc::clone(&state.hub),
        };

        if let Err(e) = state
            .runner
            .run(&message, &recipients, &reporter, lease.cancel_flag())
            .await
        {
            tracing::warn!(kind = %kind, error = %e, "Batch did not start");
        }
        drop(lease);
    });

    Ok((StatusCode::ACCEPTED, Json(BatchStarted { kind, total })))
}

/// Records attempts in the ledger and mirrors them to progress viewers
struct ServerReporter {
    ledger: LedgerReporter,
    hub: Arc<ProgressHub>,
}

#[async_trait]
impl BatchReporter for ServerReporter {
    async fn on_success(&self, recipient: &Recipient, message: &OutboundMessage) {
        self.ledger.on_success(recipient, message).await;
        self.hub.publish(ServerMessage::Attempt {
            recipient: recipient.to_string(),
            success: true,
            reason: None,
        });
    }

    async fn on_failure(&self, recipient: &Recipient, reason: &str) {
        self.ledger.on_failure(recipient, reason).await;
        self.hub.publish(ServerMessage::Attempt {
            recipient: recipient.to_string(),
            success: false,
            reason: Some(reason.to_string()),
        });
    }

    async fn on_progress(&self, progress: BatchProgress) {
        self.hub.update_with(|snapshot| snapshot.progress(progress));
    }

    async fn on_finish(&self, result: &BatchResult) {
        self.ledger.on_finish(result).await;
        self.hub.update_with(|snapshot| snapshot.finish(result));
    }
}
