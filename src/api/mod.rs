//! wacrm REST API
//!
//! HTTP API layer for wacrm, built with Axum. The browser and the CLI talk
//! to this server; only the server holds the WhatsApp credentials.
//!
//! # Endpoints
//!
//! ## Messages
//! - `POST /api/v1/messages` - Compose and send one message
//! - `POST /api/v1/preview` - Preview a compose request
//!
//! ## Templates
//! - `GET /api/v1/templates` - List the catalog
//! - `POST /api/v1/templates` - Submit a template for review
//! - `DELETE /api/v1/templates/:id` - Delete a template
//! - `GET /api/v1/templates/:name/variables` - Variable inputs for a template
//!
//! ## Batches
//! - `POST /api/v1/broadcast` - Send to a pasted number list
//! - `POST /api/v1/campaigns` - Send to leads with a given status
//! - `GET /api/v1/batch` - Current batch snapshot
//! - `POST /api/v1/batch/cancel` - Cancel the running batch
//!
//! ## Ledger
//! - `GET /api/v1/leads`, `POST /api/v1/leads`, `DELETE /api/v1/leads/:id`
//! - `GET /api/v1/logs`, `DELETE /api/v1/logs`
//! - `GET /api/v1/metrics`
//! - `GET /api/v1/inbox`, `GET /api/v1/inbox/:phone`, `POST /api/v1/inbox/:phone/reply`
//!
//! ## Relay
//! - `GET /send-template-ui?to=&ref=` - Send the notification template
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Batch progress stream
//!
//! # Example
//!
//! ```rust,ignore
//! use wacrm::api::{serve, AppState};
//! use wacrm::config::Config;
//! use wacrm::ledger::LedgerStore;
//! use wacrm::messaging::ReqwestTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default();
//!     let transport = Arc::new(ReqwestTransport::new(config.whatsapp.request_timeout_ms)?);
//!     let ledger = LedgerStore::open(&config.ledger.path, config.ledger.max_logs)?;
//!
//!     let server = config.server.clone();
//!     serve(AppState::new(config, transport, ledger), &server).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, BatchLease, BatchSlot};

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let api_routes = Router::new()
        // Message routes
        .route("/messages", post(routes::messages::send_message))
        .route("/preview", post(routes::messages::preview_message))
        // Template routes
        .route(
            "/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route("/templates/:id", delete(routes::templates::delete_template))
        .route(
            "/templates/:name/variables",
            get(routes::templates::template_variables),
        )
        // Batch routes
        .route("/broadcast", post(routes::batch::start_broadcast))
        .route("/campaigns", post(routes::batch::start_campaign))
        .route("/batch", get(routes::batch::batch_status))
        .route("/batch/cancel", post(routes::batch::cancel_batch))
        // Ledger routes
        .route(
            "/leads",
            get(routes::leads::list_leads).post(routes::leads::create_lead),
        )
        .route("/leads/:id", delete(routes::leads::delete_lead))
        .route(
            "/logs",
            get(routes::ledger::list_logs).delete(routes::ledger::clear_logs),
        )
        .route("/metrics", get(routes::ledger::get_metrics))
        .route("/inbox", get(routes::ledger::list_threads))
        .route("/inbox/:phone", get(routes::ledger::get_thread))
        .route("/inbox/:phone/reply", post(routes::ledger::reply));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/send-template-ui", get(routes::relay::send_template))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Any origin when none are configured, else only the listed ones
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("wacrm API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("wacrm API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ledger::LedgerStore;
    use crate::messaging::MockTransport;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.whatsapp.token = "test-token".to_string();
        config.whatsapp.phone_number_id = "PN1".to_string();
        config.whatsapp.waba_id = "WABA1".to_string();
        config.batch.delay_ms = 500;
        config
    }

    fn create_test_app(config: Config) -> (Router, MockTransport) {
        let mock = MockTransport::new();
        let state = AppState::new(config, Arc::new(mock.clone()), LedgerStore::in_memory(20));
        (build_router(state), mock)
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn catalog_body() -> Value {
        json!({
            "data": [
                {
                    "id": "1",
                    "name": "hello_user",
                    "language": "en",
                    "status": "APPROVED",
                    "category": "UTILITY",
                    "components": [{"type": "BODY", "text": "Hello {{1}}"}]
                },
                {
                    "id": "2",
                    "name": "draft_offer",
                    "language": "en_US",
                    "status": "PENDING_REVIEW",
                    "category": "MARKETING",
                    "components": [{"type": "BODY", "text": "Save {{1}} on {{2}}"}]
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _mock) = create_test_app(test_config());
        assert_eq!(get(&app, "/health/live").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_requires_credentials() {
        let (app, _mock) = create_test_app(test_config());
        assert_eq!(get(&app, "/health/ready").await.status(), StatusCode::OK);

        let (bare, _mock) = create_test_app(Config::default());
        assert_eq!(
            get(&bare, "/health/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let health = body_json(get(&bare, "/health").await).await;
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["whatsapp"], "missing");
    }

    #[tokio::test]
    async fn test_send_text_updates_ledger() {
        let (app, mock) = create_test_app(test_config());
        mock.push_json(200, json!({"messages": [{"id": "wamid.1"}]}));

        let response = send_json(
            &app,
            "POST",
            "/api/v1/messages",
            json!({"to": "+1 (555) 000-1111", "text": "Hi there"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["to"], "15550001111");
        assert_eq!(body["outcome"]["status"], "success");

        let call = &mock.calls()[0];
        assert_eq!(call.bearer_token, "test-token");
        assert_eq!(call.body.as_ref().unwrap()["text"]["body"], "Hi there");

        let metrics = body_json(get(&app, "/api/v1/metrics").await).await;
        assert_eq!(metrics["sent"], 1);
        assert_eq!(metrics["delivered"], 1);
        assert_eq!(metrics["threads"], 1);

        let logs = body_json(get(&app, "/api/v1/logs").await).await;
        assert_eq!(logs["logs"][0]["message"], "Message sent to 15550001111");
    }

    #[tokio::test]
    async fn test_send_empty_text_fails_without_network() {
        let (app, mock) = create_test_app(test_config());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/messages",
            json!({"to": "15550001111", "text": "   "}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"]["status"], "failure");
        assert_eq!(body["outcome"]["reason"], "message text is empty");
        assert_eq!(mock.call_count(), 0);

        let metrics = body_json(get(&app, "/api/v1/metrics").await).await;
        assert_eq!(metrics["failed"], 1);
    }

    #[tokio::test]
    async fn test_preview_template_from_catalog() {
        let (app, mock) = create_test_app(test_config());
        mock.push_json(200, catalog_body());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/preview",
            json!({"kind": "template", "template_name": "hello_user", "variables": ["Maria"]}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["preview"], "Hello *Maria*");
        assert_eq!(body["message"]["language_code"], "en");
        assert_eq!(body["message"]["parameters"], json!(["Maria"]));
    }

    #[tokio::test]
    async fn test_list_templates_approved_only() {
        let (app, mock) = create_test_app(test_config());
        mock.push_json(200, catalog_body());
        mock.push_json(200, catalog_body());

        let body = body_json(get(&app, "/api/v1/templates").await).await;
        assert_eq!(body["templates"].as_array().unwrap().len(), 1);
        assert_eq!(body["stats"]["total"], 2);
        assert_eq!(body["stats"]["pending"], 1);

        let all = body_json(get(&app, "/api/v1/templates?all=true&sort=status").await).await;
        assert_eq!(all["templates"][1]["name"], "draft_offer");
        assert_eq!(all["templates"][1]["variable_count"], 2);
    }

    #[tokio::test]
    async fn test_template_variables() {
        let (app, mock) = create_test_app(test_config());
        mock.push_json(200, catalog_body());

        let body = body_json(get(&app, "/api/v1/templates/draft_offer/variables").await).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["panel"]["state"], "visible");
        assert_eq!(body["panel"]["inputs"][0]["label"], "{{1}}");

        let missing = get(&app, "/api/v1/templates/nope/variables").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_template_requires_fields() {
        let (app, mock) = create_test_app(test_config());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/templates",
            json!({"name": "promo", "body": ""}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_template_remote_error() {
        let (app, mock) = create_test_app(test_config());
        mock.push_error(400, "Template not found");

        let response = send_json(&app, "DELETE", "/api/v1/templates/991", json!({})).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Template not found"));
    }

    #[tokio::test]
    async fn test_broadcast_without_recipients() {
        let (app, mock) = create_test_app(test_config());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/broadcast",
            json!({"numbers": "12, abc\n345", "text": "Sale"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_accepted_then_conflict() {
        let (app, mock) = create_test_app(test_config());
        mock.push_accepted();
        mock.push_accepted();

        let first = send_json(
            &app,
            "POST",
            "/api/v1/broadcast",
            json!({"numbers": "111111\n222222", "text": "Sale"}),
        )
        .await;
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        let body = body_json(first).await;
        assert_eq!(body["kind"], "broadcast");
        assert_eq!(body["total"], 2);

        let second = send_json(
            &app,
            "POST",
            "/api/v1/broadcast",
            json!({"numbers": "333333", "text": "Sale"}),
        )
        .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let snapshot = body_json(get(&app, "/api/v1/batch").await).await;
        assert_eq!(snapshot["kind"], "broadcast");
        assert_eq!(snapshot["total"], 2);
    }

    #[tokio::test]
    async fn test_broadcast_runs_to_completion_and_frees_slot() {
        let mut config = test_config();
        config.batch.delay_ms = 0;
        let (app, mock) = create_test_app(config);
        mock.push_accepted();
        mock.push_error(400, "bad number");

        let started = send_json(
            &app,
            "POST",
            "/api/v1/broadcast",
            json!({"numbers": "111111\n222222", "text": "Sale"}),
        )
        .await;
        assert_eq!(started.status(), StatusCode::ACCEPTED);

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let snapshot = body_json(get(&app, "/api/v1/batch").await).await;
        assert_eq!(snapshot["phase"], "finished");
        assert_eq!(snapshot["attempted"], 2);
        assert_eq!(snapshot["succeeded"], 1);
        assert_eq!(snapshot["failed"], 1);

        let logs = body_json(get(&app, "/api/v1/logs").await).await;
        assert_eq!(logs["logs"][0]["message"], "Broadcast finished: 1 sent, 1 failed");
        assert_eq!(
            logs["logs"][1]["message"],
            "Broadcast failed for 222222: bad number"
        );

        let metrics = body_json(get(&app, "/api/v1/metrics").await).await;
        assert_eq!(metrics["sent"], 1);
        assert_eq!(metrics["delivered"], 1);
        assert_eq!(metrics["failed"], 1);

        mock.push_accepted();
        let again = send_json(
            &app,
            "POST",
            "/api/v1/broadcast",
            json!({"numbers": "333333", "text": "Sale"}),
        )
        .await;
        assert_eq!(again.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_campaign_rejects_unknown_status() {
        let (app, _mock) = create_test_app(test_config());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/campaigns",
            json!({"status": "cold", "text": "Hi"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_campaign_without_matching_leads() {
        let (app, mock) = create_test_app(test_config());

        let response = send_json(
            &app,
            "POST",
            "/api/v1/campaigns",
            json!({"status": "hot", "text": "Hi"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_without_batch() {
        let (app, _mock) = create_test_app(test_config());
        let body = body_json(send_json(&app, "POST", "/api/v1/batch/cancel", json!({})).await).await;
        assert_eq!(body["cancelled"], false);
    }

    #[tokio::test]
    async fn test_lead_lifecycle() {
        let (app, _mock) = create_test_app(test_config());

        let created = send_json(
            &app,
            "POST",
            "/api/v1/leads",
            json!({"name": "Ana", "phone": "+44 7700 900123", "status": "Hot"}),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let lead = body_json(created).await;
        let id = lead["id"].as_str().unwrap().to_string();

        let hot = body_json(get(&app, "/api/v1/leads?status=hot").await).await;
        assert_eq!(hot["total"], 1);
        let warm = body_json(get(&app, "/api/v1/leads?status=warm").await).await;
        assert_eq!(warm["total"], 0);

        let deleted = send_json(&app, "DELETE", &format!("/api/v1/leads/{}", id), json!({})).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let again = send_json(&app, "DELETE", &format!("/api/v1/leads/{}", id), json!({})).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_lead_requires_name() {
        let (app, _mock) = create_test_app(test_config());
        let response = send_json(
            &app,
            "POST",
            "/api/v1/leads",
            json!({"name": " ", "phone": "123456"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reply_to_thread() {
        let (app, mock) = create_test_app(test_config());
        mock.push_accepted();
        mock.push_accepted();

        let missing = send_json(
            &app,
            "POST",
            "/api/v1/inbox/15550001111/reply",
            json!({"text": "Thanks"}),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        send_json(
            &app,
            "POST",
            "/api/v1/messages",
            json!({"to": "15550001111", "text": "Hello"}),
        )
        .await;
        let replied = send_json(
            &app,
            "POST",
            "/api/v1/inbox/15550001111/reply",
            json!({"text": "Thanks"}),
        )
        .await;
        assert_eq!(replied.status(), StatusCode::OK);

        let thread = body_json(get(&app, "/api/v1/inbox/15550001111").await).await;
        assert_eq!(thread["name"], "Lead");
        assert_eq!(thread["messages"].as_array().unwrap().len(), 2);

        // Replies are not counted
        let metrics = body_json(get(&app, "/api/v1/metrics").await).await;
        assert_eq!(metrics["sent"], 1);
    }

    #[tokio::test]
    async fn test_relay_passes_graph_response_through() {
        let (app, mock) = create_test_app(test_config());
        mock.push_json(200, json!({"messages": [{"id": "wamid.relay"}]}));

        let response = get(&app, "/send-template-ui?to=%2B15550001111&ref=ORD-7").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["messages"][0]["id"], "wamid.relay");

        let sent = mock.calls()[0].body.clone().unwrap();
        assert_eq!(sent["to"], "15550001111");
        assert_eq!(sent["template"]["name"], "service_notification");
        assert_eq!(sent["template"]["language"]["code"], "en");
        assert_eq!(
            sent["template"]["components"][0]["parameters"][0]["text"],
            "ORD-7"
        );
    }

    #[tokio::test]
    async fn test_relay_requires_recipient() {
        let (app, mock) = create_test_app(test_config());
        let response = get(&app, "/send-template-ui?ref=ORD-7").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }
}
