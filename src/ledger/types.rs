//! Ledger records
//!
//! - `Lead`: a contact tracked through the sales pipeline
//! - `LogEntry`: one line of the activity log
//! - `InboxThread` and `InboxMessage`: the conversation view per phone
//! - `MessageMetrics`: send counters

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::types::digits_only;

/// Pipeline stage of a lead
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    Warm,
    Hot,
    Contacted,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Warm,
        LeadStatus::Hot,
        LeadStatus::Contacted,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Warm => "Warm",
            LeadStatus::Hot => "Hot",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Converted => "Converted",
            LeadStatus::Lost => "Lost",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown lead status: {}", s))
    }
}

/// Which leads a campaign targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LeadStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: LeadStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// A tracked contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    /// Phone as entered
    pub phone: String,
    pub status: LeadStatus,
    /// Day of the last successful send
    #[serde(default)]
    pub last_contact: Option<NaiveDate>,
}

impl Lead {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, status: LeadStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            status,
            last_contact: None,
        }
    }

    /// Phone reduced to digits, used for matching
    pub fn phone_digits(&self) -> String {
        digits_only(&self.phone)
    }
}

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Success,
    Error,
    Info,
}

/// One activity log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

/// Direction of an inbox message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub direction: Direction,
    pub text: String,
    pub time: DateTime<Local>,
}

/// Conversation with one phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxThread {
    /// Display name, fixed when the thread is first created
    pub name: String,
    #[serde(default)]
    pub messages: Vec<InboxMessage>,
}

impl InboxThread {
    pub fn last_message(&self) -> Option<&InboxMessage> {
        self.messages.last()
    }
}

/// Thread with its key, as returned by listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub phone: String,
    pub name: String,
    pub message_count: usize,
    pub last_text: Option<String>,
    pub last_time: Option<DateTime<Local>>,
}

/// Send counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
}
