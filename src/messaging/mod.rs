//! Messaging Core
//!
//! Everything between "the user picked a template and typed some values" and
//! "the Graph API accepted or rejected the message":
//!
//! - **types**: Outbound messages, recipients, template definitions, outcomes
//! - **template**: Placeholder extraction, previews and dispatch parameters
//! - **composer**: Builds an `OutboundMessage` from form state
//! - **wire**: Graph API request and response bodies
//! - **transport**: HTTP abstraction with reqwest and mock implementations
//! - **client**: Typed Graph API calls
//! - **dispatcher**: One message to one recipient, reduced to an outcome
//! - **batch**: Broadcasts and campaigns over many recipients
//! - **catalog**: Template filtering, search, ordering and stats
//!
//! # Architecture
//!
//! ```text
//! Single send:
//!   ComposeRequest → Composer → OutboundMessage → Dispatcher → DispatchOutcome
//!
//! Bulk send:
//!   Recipients → BatchRunner → Dispatcher (per recipient) → BatchReporter
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wacrm::messaging::{
//!     Composer, ComposeRequest, Dispatcher, GraphClient, GraphConfig, Recipient, ReqwestTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(ReqwestTransport::new(10_000)?);
//!     let client = GraphClient::new(transport, GraphConfig::default());
//!     let dispatcher = Dispatcher::new(Arc::new(client));
//!
//!     let message = Composer::new(&[]).compose(&ComposeRequest::text("Hello"));
//!     let to = Recipient::from_phone("+1 555 000 1111").ok_or("bad number")?;
//!     let outcome = dispatcher.send(&message, &to).await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod catalog;
pub mod client;
pub mod composer;
pub mod dispatcher;
pub mod template;
pub mod transport;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use batch::{BatchConfig, BatchError, BatchKind, BatchProgress, BatchReporter, BatchRunner, CancelFlag};
pub use catalog::{CatalogStats, TemplateSort, TemplateSummary};
pub use client::{GraphClient, GraphConfig, GraphError};
pub use composer::{ComposeRequest, Composer, MessageKind};
pub use dispatcher::Dispatcher;
pub use template::{ExtractionMode, Placeholder, VariableInput, VariablePanel};
pub use transport::{GraphRequest, GraphResponse, HttpTransport, MockTransport, ReqwestTransport, TransportError};
pub use types::{
    parse_recipient_list, BatchResult, ComponentType, DispatchOutcome, OutboundMessage, Recipient,
    TemplateComponent, TemplateDefinition, ValidationError,
};
pub use wire::{MessagePayload, NewTemplate};
