//! Template Relay
//!
//! - GET /send-template-ui?to=&ref= - Send the configured notification
//!   template with `ref` as its only body parameter
//!
//! The Graph response status and JSON body are passed through unchanged.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::dto::RelayQuery;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::messaging::template::dispatch_parameters;
use crate::messaging::{MessagePayload, OutboundMessage, Recipient};

/// GET /send-template-ui
pub async fn send_template(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelayQuery>,
) -> ApiResult<Response> {
    let recipient = Recipient::from_phone(&query.to)
        .ok_or_else(|| ApiError::Validation("query parameter `to` is required".to_string()))?;

    let server = &state.config.server;
    let message = OutboundMessage::template(
        &server.relay_template,
        &server.relay_language,
        dispatch_parameters(&[query.reference], 1),
    );

    let response = state
        .graph
        .send_raw(&MessagePayload::new(&message, &recipient))
        .await?;

    tracing::info!(
        to = %recipient,
        template = %server.relay_template,
        status = response.status,
        "Relayed template"
    );

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
        .into_response())
}
