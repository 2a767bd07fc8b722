//! Ledger Routes
//!
//! Activity log, send metrics and the inbox.
//!
//! - GET /api/v1/logs - Activity log, newest first
//! - DELETE /api/v1/logs - Clear the activity log
//! - GET /api/v1/metrics - Send counters
//! - GET /api/v1/inbox - Thread listing
//! - GET /api/v1/inbox/:phone - One thread
//! - POST /api/v1/inbox/:phone/reply - Text reply into a thread

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    InboxListResponse, InboxQuery, LogListResponse, MetricsResponse, ReplyRequest, SendResult,
    ThreadResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::ledger::{Direction, LedgerUpdate, LogKind};
use crate::messaging::{DispatchOutcome, OutboundMessage, Recipient};

/// GET /api/v1/logs
pub async fn list_logs(State(state): State<Arc<AppState>>) -> Json<LogListResponse> {
    let logs = state.ledger.read(|ledger| ledger.logs.clone()).await;
    Json(LogListResponse { logs })
}

/// DELETE /api/v1/logs
pub async fn clear_logs(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.ledger.apply(LedgerUpdate::ClearLogs).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let response = state
        .ledger
        .read(|ledger| MetricsResponse {
            sent: ledger.metrics.sent,
            delivered: ledger.metrics.delivered,
            failed: ledger.metrics.failed,
            total_leads: ledger.leads.len(),
            threads: ledger.inbox.len(),
        })
        .await;
    Json(response)
}

/// GET /api/v1/inbox
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InboxQuery>,
) -> Json<InboxListResponse> {
    let search = query.search.unwrap_or_default();
    let threads = state.ledger.read(|ledger| ledger.threads(&search)).await;
    Json(InboxListResponse { threads })
}

/// GET /api/v1/inbox/:phone
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let recipient = parse_phone(&phone)?;
    let thread = state
        .ledger
        .read(|ledger| ledger.thread(recipient.digits()).cloned())
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No conversation with {}", recipient)))?;

    Ok(Json(ThreadResponse {
        phone: recipient.to_string(),
        name: thread.name,
        messages: thread.messages,
    }))
}

/// POST /api/v1/inbox/:phone/reply
///
/// Replies are logged and threaded but not counted in the send metrics.
pub async fn reply(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> ApiResult<Json<SendResult>> {
    let recipient = parse_phone(&phone)?;
    let name = state
        .ledger
        .read(|ledger| ledger.thread(recipient.digits()).map(|t| t.name.clone()))
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No conversation with {}", recipient)))?;

    let message = OutboundMessage::text(req.text);
    message
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let outcome = state.dispatcher.send(&message, &recipient).await;
    let updates = match &outcome {
        DispatchOutcome::Success { .. } => vec![
            LedgerUpdate::RecordMessage {
                phone: recipient.digits().to_string(),
                direction: Direction::Out,
                text: message.summary(),
                name,
            },
            LedgerUpdate::log(LogKind::Success, format!("Reply sent to {}", recipient)),
        ],
        DispatchOutcome::Failure { reason } => vec![LedgerUpdate::log(
            LogKind::Error,
            format!("Failed to reply: {}", reason),
        )],
    };
    state.ledger.apply_all(updates).await?;

    Ok(Json(SendResult {
        to: recipient.to_string(),
        outcome,
    }))
}

fn parse_phone(phone: &str) -> ApiResult<Recipient> {
    Recipient::from_phone(phone)
        .ok_or_else(|| ApiError::Validation(format!("invalid phone number: {:?}", phone)))
}
