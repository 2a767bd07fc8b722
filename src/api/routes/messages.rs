//! Message Routes
//!
//! - POST /api/v1/messages - Compose and send one message
//! - POST /api/v1/preview - Preview a compose request without sending

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{PreviewResponse, SendMessageRequest, SendResult};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::ledger::record_single;
use crate::messaging::{ComposeRequest, Composer, MessageKind, Recipient};

/// POST /api/v1/messages
///
/// Dispatch failures are reported in the body, not as an HTTP error.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<SendResult>> {
    let recipient = Recipient::from_phone(&req.to)
        .ok_or_else(|| ApiError::Validation(format!("invalid phone number: {:?}", req.to)))?;

    let catalog = catalog_for(&state, &req.message).await;
    let message = Composer::new(&catalog).compose(&req.message);

    let outcome = state.dispatcher.send(&message, &recipient).await;
    record_single(&state.ledger, &recipient, &message, &outcome).await;

    Ok(Json(SendResult {
        to: recipient.to_string(),
        outcome,
    }))
}

/// POST /api/v1/preview
pub async fn preview_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ComposeRequest>,
) -> Json<PreviewResponse> {
    let catalog = catalog_for(&state, &req).await;
    let composer = Composer::new(&catalog);
    let message = composer.compose(&req);

    Json(PreviewResponse {
        preview: composer.preview(&req),
        invalid: message.validate().err().map(|e| e.to_string()),
        message,
    })
}

/// Templates need the catalog to size parameters; text messages do not
async fn catalog_for(
    state: &AppState,
    req: &ComposeRequest,
) -> Vec<crate::messaging::TemplateDefinition> {
    match req.kind {
        MessageKind::Template => state.catalog().await,
        MessageKind::Text => Vec::new(),
    }
}
