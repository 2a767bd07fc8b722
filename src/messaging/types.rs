//! Core messaging types
//!
//! This module defines the values that flow through the send pipeline:
//! - `OutboundMessage`: what gets sent (text or template)
//! - `Recipient`: who it goes to (digits-only phone number)
//! - `TemplateDefinition`: a template as returned by the Graph catalog
//! - `DispatchOutcome` and `BatchResult`: what happened

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum digit count (exclusive) for a number to be accepted in bulk sends
pub const MIN_BULK_DIGITS: usize = 5;

/// Language used when neither the caller nor the catalog provides one
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// A message ready to be dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Free-form text message
    Text { body: String },
    /// Pre-approved template with positional body parameters
    Template {
        name: String,
        language_code: String,
        parameters: Vec<String>,
    },
}

/// Reasons a message is rejected before it reaches the network
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message text is empty")]
    EmptyText,

    #[error("template not selected")]
    TemplateNotSelected,
}

impl OutboundMessage {
    /// Create a text message
    pub fn text(body: impl Into<String>) -> Self {
        OutboundMessage::Text { body: body.into() }
    }

    /// Create a template message
    pub fn template(
        name: impl Into<String>,
        language_code: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        OutboundMessage::Template {
            name: name.into(),
            language_code: language_code.into(),
            parameters,
        }
    }

    /// Check the message invariants
    ///
    /// Text bodies must contain something other than whitespace and
    /// templates must carry a name. Language codes are left to the remote
    /// endpoint to reject.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            OutboundMessage::Text { body } if body.trim().is_empty() => {
                Err(ValidationError::EmptyText)
            }
            OutboundMessage::Template { name, .. } if name.trim().is_empty() => {
                Err(ValidationError::TemplateNotSelected)
            }
            _ => Ok(()),
        }
    }

    /// Wire `type` value
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Template { .. } => "template",
        }
    }

    /// Short human-readable form used for inbox entries
    pub fn summary(&self) -> String {
        match self {
            OutboundMessage::Text { body } => body.clone(),
            OutboundMessage::Template { name, .. } => format!("Template: {}", name),
        }
    }
}

/// A destination phone number, digits only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient {
    phone_digits: String,
}

impl Recipient {
    /// Normalize any phone representation (`+1 (234) 567-890`) to digits
    ///
    /// Returns `None` when nothing numeric remains.
    pub fn from_phone(phone: &str) -> Option<Self> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            None
        } else {
            Some(Self {
                phone_digits: digits,
            })
        }
    }

    /// Normalize and apply the bulk-send length rule
    pub fn for_bulk(phone: &str) -> Option<Self> {
        Self::from_phone(phone).filter(|r| r.is_bulk_eligible())
    }

    /// The normalized number
    pub fn digits(&self) -> &str {
        &self.phone_digits
    }

    /// Whether the number is long enough for broadcast/campaign use
    pub fn is_bulk_eligible(&self) -> bool {
        self.phone_digits.len() > MIN_BULK_DIGITS
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.phone_digits)
    }
}

/// Strip everything except ASCII digits
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a pasted number list
///
/// Entries are separated by newlines or commas. Each entry is reduced to its
/// digits and kept only if it is longer than five digits. Input order is
/// preserved and duplicates are kept.
pub fn parse_recipient_list(raw: &str) -> Vec<Recipient> {
    raw.split(['\n', ','])
        .filter_map(|entry| Recipient::for_bulk(entry.trim()))
        .collect()
}

/// Component section of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    Header,
    Body,
    Footer,
    Buttons,
    #[serde(other)]
    Other,
}

/// One component of a template definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateComponent {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl TemplateComponent {
    /// Build a component with text
    pub fn new(component_type: ComponentType, text: impl Into<String>) -> Self {
        Self {
            component_type,
            text: Some(text.into()),
            format: None,
        }
    }

    /// Builder method: set the format (e.g. `TEXT` for headers)
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// A message template as listed by the Graph catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    /// Unix seconds, as returned by the catalog
    #[serde(default)]
    pub created_time: i64,
    #[serde(default)]
    pub components: Vec<TemplateComponent>,
}

impl TemplateDefinition {
    /// Create a template definition with no components
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            language: language.into(),
            status: "APPROVED".to_string(),
            category: "UTILITY".to_string(),
            created_time: 0,
            components: Vec::new(),
        }
    }

    /// Builder method: append a component
    pub fn component(mut self, component: TemplateComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Builder method: set the review status
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Text of the first component of the given type
    pub fn text_of(&self, component_type: ComponentType) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.component_type == component_type)
            .and_then(|c| c.text.as_deref())
    }

    /// Text of the BODY component, if any
    pub fn body_text(&self) -> Option<&str> {
        self.text_of(ComponentType::Body)
    }
}

/// Result of a single send attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Failure { reason: String },
}

impl DispatchOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        DispatchOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success { .. })
    }
}

/// Running tally of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the run stopped early on request
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchResult {
    /// Start a tally for `total` recipients
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Record one attempt
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.attempted = self.succeeded + self.failed;
    }

    /// Every recipient has been attempted
    pub fn is_complete(&self) -> bool {
        self.attempted == self.total
    }

    /// Completion percentage, rounded
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.attempted as f64 / self.total as f64) * 100.0).round() as u8
    }
}
