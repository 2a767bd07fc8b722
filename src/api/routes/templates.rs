//! Template Routes
//!
//! - GET /api/v1/templates - List the catalog (refreshed from Graph)
//! - POST /api/v1/templates - Submit a template for review
//! - DELETE /api/v1/templates/:id - Delete a template
//! - GET /api/v1/templates/:name/variables - Variable inputs for a template

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CreateTemplateRequest, CreateTemplateResponse, TemplateListResponse, TemplateQuery,
    VariablesQuery, VariablesResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::messaging::catalog;
use crate::messaging::template::{variable_count, variable_panel};
use crate::messaging::{Composer, NewTemplate, TemplateSummary};

/// GET /api/v1/templates
///
/// Approved templates in the configured languages unless `all=true`.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<Json<TemplateListResponse>> {
    let templates = state.graph.list_templates().await?;
    state.store_catalog(templates.clone()).await;

    let stats = catalog::stats(&templates);
    let visible = if query.all {
        templates.iter().collect()
    } else {
        catalog::approved(&templates, &state.config.whatsapp.template_languages)
    };

    let listed = catalog::search(
        visible,
        query.search.as_deref().unwrap_or_default(),
        query.sort.unwrap_or_default(),
    );

    tracing::debug!(listed = listed.len(), total = stats.total, "Listed templates");

    Ok(Json(TemplateListResponse {
        templates: listed.into_iter().map(TemplateSummary::from).collect(),
        stats,
    }))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<CreateTemplateResponse>)> {
    if req.name.trim().is_empty() || req.body.trim().is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".to_string()));
    }

    let template = NewTemplate::body_only(req.name.trim(), &req.category, &req.language, &req.body);
    let created = state.graph.create_template(&template).await?;

    // Next lookup refetches so the new entry shows up
    state.store_catalog(Vec::new()).await;

    tracing::info!(template = %template.name, id = %created.id, "Template submitted for review");

    Ok((
        StatusCode::CREATED,
        Json(CreateTemplateResponse {
            id: created.id,
            status: created.status,
        }),
    ))
}

/// DELETE /api/v1/templates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.graph.delete_template(&id).await?;
    state.store_catalog(Vec::new()).await;

    tracing::info!(id = %id, "Template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/templates/:name/variables
pub async fn template_variables(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<VariablesQuery>,
) -> ApiResult<Json<VariablesResponse>> {
    let templates = state.catalog().await;
    let template = Composer::new(&templates)
        .find_template(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Template '{}' not found", name)))?;

    Ok(Json(VariablesResponse {
        template: template.name.clone(),
        mode: query.mode,
        count: variable_count(template),
        panel: variable_panel(Some(template), query.mode),
    }))
}
