//! # wacrm
//!
//! WhatsApp Business CRM relay: template messaging, broadcasts, lead
//! campaigns and a local lead ledger, served over a small REST API that
//! keeps the Graph API credentials on the server.
//!
//! ## Features
//!
//! - **Template variables**: `{{n}}` placeholders become labeled inputs, live previews and dispatch parameters
//! - **Dispatch**: One send, one outcome; validation before any network call
//! - **Batches**: Ordered broadcasts and campaigns with progress and cancellation
//! - **Ledger**: Leads, activity log, inbox threads and send metrics persisted as JSON
//! - **Real-time**: WebSocket progress for running batches
//!
//! ## Modules
//!
//! - [`messaging`]: Resolver, composer, Graph client, dispatcher and batch runner
//! - [`ledger`]: Application state and its reducer
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Batch progress stream
//! - [`config`]: File and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wacrm::messaging::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(ReqwestTransport::new(10_000)?);
//!     let client = Arc::new(GraphClient::new(
//!         transport,
//!         GraphConfig {
//!             phone_number_id: "123456789".into(),
//!             waba_id: "987654321".into(),
//!             token: std::env::var("WHATSAPP_TOKEN")?,
//!             ..Default::default()
//!         },
//!     ));
//!
//!     let catalog = client.list_templates().await?;
//!     let request = ComposeRequest::template("hello_user", vec!["Maria".into()]);
//!     let message = Composer::new(&catalog).compose(&request);
//!
//!     let dispatcher = Dispatcher::new(client);
//!     let to = Recipient::from_phone("+1 555 000 1111").ok_or("bad number")?;
//!     println!("{:?}", dispatcher.send(&message, &to).await);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod ledger;
pub mod messaging;
pub mod websocket;

// Re-export top-level types for convenience
pub use messaging::{
    BatchConfig, BatchError, BatchKind, BatchResult, BatchRunner, ComposeRequest, Composer,
    DispatchOutcome, Dispatcher, GraphClient, GraphConfig, GraphError, OutboundMessage, Recipient,
    TemplateDefinition,
};

pub use ledger::{Lead, LeadStatus, Ledger, LedgerError, LedgerStore, LedgerUpdate};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{BatchSnapshot, ClientMessage, HubConfig, ProgressHub, ServerMessage};

pub use config::{Config, ConfigError, LoggingConfig};
