//! Lead Routes
//!
//! - GET /api/v1/leads - List leads, with search and status filter
//! - POST /api/v1/leads - Add a lead
//! - DELETE /api/v1/leads/:id - Remove a lead

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{CreateLeadRequest, LeadListResponse, LeadQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::ledger::{Lead, LedgerUpdate, StatusFilter};

/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadQuery>,
) -> ApiResult<Json<LeadListResponse>> {
    let filter = match query.status.as_deref() {
        Some(status) if !status.trim().is_empty() => {
            status.parse().map_err(ApiError::Validation)?
        }
        _ => StatusFilter::All,
    };
    let search = query.search.unwrap_or_default();

    let leads: Vec<Lead> = state
        .ledger
        .read(|ledger| {
            ledger
                .find_leads(&search, filter)
                .into_iter()
                .cloned()
                .collect()
        })
        .await;

    Ok(Json(LeadListResponse {
        total: leads.len(),
        leads,
    }))
}

/// POST /api/v1/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let lead = Lead::new(req.name.trim(), req.phone.trim(), req.status);
    state.ledger.apply(LedgerUpdate::AddLead(lead.clone())).await?;

    tracing::info!(lead_id = %lead.id, status = %lead.status, "Added lead");
    Ok((StatusCode::CREATED, Json(lead)))
}

/// DELETE /api/v1/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.ledger.apply(LedgerUpdate::DeleteLead(id)).await?;

    tracing::info!(lead_id = %id, "Deleted lead");
    Ok(StatusCode::NO_CONTENT)
}
