//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::ledger::{InboxMessage, Lead, LeadStatus, LogEntry, ThreadSummary};
use crate::messaging::{
    BatchKind, CatalogStats, ComposeRequest, DispatchOutcome, ExtractionMode, OutboundMessage,
    TemplateSort, TemplateSummary, VariablePanel,
};

// ============================================
// MESSAGE DTOs
// ============================================

/// Single send request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Destination phone, any formatting
    pub to: String,
    #[serde(flatten)]
    pub message: ComposeRequest,
}

/// Result of a single send
///
/// Returned with 200 whatever the outcome; `outcome.status` tells them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub to: String,
    pub outcome: DispatchOutcome,
}

/// Preview of a compose request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// Rendered text; absent for empty text or unknown templates
    pub preview: Option<String>,
    /// The message that would be dispatched
    pub message: OutboundMessage,
    /// Why the message would be rejected, if it would
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid: Option<String>,
}

// ============================================
// TEMPLATE DTOs
// ============================================

/// Template listing query
#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<TemplateSort>,
    /// Include every status and language, not just approved ones
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
    /// Counts over the whole fetched catalog
    pub stats: CatalogStats,
}

/// Submit a body-only template for review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_template_language")]
    pub language: String,
    pub body: String,
}

fn default_category() -> String {
    "MARKETING".to_string()
}

fn default_template_language() -> String {
    "en_US".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VariablesQuery {
    #[serde(default)]
    pub mode: ExtractionMode,
}

/// Variable inputs for one template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablesResponse {
    pub template: String,
    pub mode: ExtractionMode,
    /// Total placeholder occurrences, the number of dispatched parameters
    pub count: usize,
    pub panel: VariablePanel,
}

// ============================================
// BATCH DTOs
// ============================================

/// Broadcast to a pasted number list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// Numbers separated by newlines or commas
    pub numbers: String,
    #[serde(flatten)]
    pub message: ComposeRequest,
}

/// Campaign over leads with a given status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRequest {
    /// Lead status, or "all"
    #[serde(default = "default_status_filter")]
    pub status: String,
    #[serde(flatten)]
    pub message: ComposeRequest,
}

fn default_status_filter() -> String {
    "all".to_string()
}

/// Accepted batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStarted {
    pub kind: BatchKind,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

// ============================================
// LEDGER DTOs
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Lead status, or "all"
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub status: LeadStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogListResponse {
    pub logs: Vec<LogEntry>,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    pub total_leads: usize,
    pub threads: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxListResponse {
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub phone: String,
    pub name: String,
    pub messages: Vec<InboxMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub text: String,
}

// ============================================
// RELAY DTOs
// ============================================

/// Query of the legacy template relay
#[derive(Debug, Default, Deserialize)]
pub struct RelayQuery {
    #[serde(default)]
    pub to: String,
    #[serde(default, rename = "ref")]
    pub reference: String,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// "ok" when all Graph credentials are set, else "missing"
    pub whatsapp: String,
    /// "ok" when the ledger is readable
    pub ledger: String,
    pub batch_running: bool,
    pub ws_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MessageKind;

    #[test]
    fn test_send_request_flattens_compose_fields() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"to": "+1 555", "kind": "template", "template_name": "hello", "variables": ["Maria"]}"#,
        )
        .unwrap();
        assert_eq!(req.message.kind, MessageKind::Template);
        assert_eq!(req.message.template_name.as_deref(), Some("hello"));
        assert_eq!(req.message.variables, vec!["Maria"]);
    }

    #[test]
    fn test_campaign_defaults_to_all() {
        let req: CampaignRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(req.status, "all");
        assert_eq!(req.message.kind, MessageKind::Text);
    }

    #[test]
    fn test_create_template_defaults() {
        let req: CreateTemplateRequest =
            serde_json::from_str(r#"{"name": "promo", "body": "Hi {{1}}"}"#).unwrap();
        assert_eq!(req.category, "MARKETING");
        assert_eq!(req.language, "en_US");
    }

    #[test]
    fn test_relay_query_ref_rename() {
        let q: RelayQuery = serde_json::from_str(r#"{"to": "123", "ref": "A-1"}"#).unwrap();
        assert_eq!(q.reference, "A-1");
    }
}
