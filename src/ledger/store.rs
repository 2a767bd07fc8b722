//! Ledger state and persistence
//!
//! `Ledger` is the whole application state. It only changes through
//! `Ledger::apply`, which takes one `LedgerUpdate`. `LedgerStore` wraps it
//! for shared async access and writes the state to a JSON file after every
//! batch of updates.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::error::{LedgerError, LedgerResult};
use super::types::{
    Direction, InboxMessage, InboxThread, Lead, LeadStatus, LogEntry, LogKind, MessageMetrics,
    StatusFilter, ThreadSummary,
};
use crate::messaging::types::{digits_only, Recipient};

/// Default cap on kept log entries
pub const DEFAULT_MAX_LOGS: usize = 20;

/// A single state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerUpdate {
    AddLead(Lead),
    DeleteLead(Uuid),
    /// Stamp today's date on the lead with this phone; `New` becomes `Contacted`
    MarkContacted { phone: String },
    AppendLog { kind: LogKind, message: String },
    ClearLogs,
    RecordMessage {
        phone: String,
        direction: Direction,
        text: String,
        /// Thread name used only when the thread does not exist yet
        name: String,
    },
    /// A message was accepted (sent and delivered both count up)
    CountDelivered,
    CountFailed,
}

impl LedgerUpdate {
    pub fn log(kind: LogKind, message: impl Into<String>) -> Self {
        LedgerUpdate::AppendLog {
            kind,
            message: message.into(),
        }
    }
}

/// Application state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub leads: Vec<Lead>,
    /// Newest first
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Keyed by digits-only phone
    #[serde(default)]
    pub inbox: BTreeMap<String, InboxThread>,
    #[serde(default)]
    pub metrics: MessageMetrics,
    #[serde(skip, default = "default_max_logs")]
    max_logs: usize,
}

fn default_max_logs() -> usize {
    DEFAULT_MAX_LOGS
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_max_logs(DEFAULT_MAX_LOGS)
    }
}

impl Ledger {
    pub fn with_max_logs(max_logs: usize) -> Self {
        Self {
            leads: Vec::new(),
            logs: Vec::new(),
            inbox: BTreeMap::new(),
            metrics: MessageMetrics::default(),
            max_logs,
        }
    }

    pub fn max_logs(&self) -> usize {
        self.max_logs
    }

    // ============================================
    // Reducer
    // ============================================

    /// Apply one update at the current local time
    pub fn apply(&mut self, update: LedgerUpdate) -> LedgerResult<()> {
        self.apply_at(update, Local::now())
    }

    /// Apply one update as if it happened at `now`
    pub fn apply_at(&mut self, update: LedgerUpdate, now: DateTime<Local>) -> LedgerResult<()> {
        match update {
            LedgerUpdate::AddLead(lead) => {
                if lead.name.trim().is_empty() || lead.phone.trim().is_empty() {
                    return Err(LedgerError::Invalid("Name and phone are required".into()));
                }
                self.leads.push(lead);
            }
            LedgerUpdate::DeleteLead(id) => {
                let before = self.leads.len();
                self.leads.retain(|l| l.id != id);
                if self.leads.len() == before {
                    return Err(LedgerError::LeadNotFound(id));
                }
            }
            LedgerUpdate::MarkContacted { phone } => {
                let digits = digits_only(&phone);
                if let Some(lead) = self
                    .leads
                    .iter_mut()
                    .find(|l| !digits.is_empty() && l.phone_digits() == digits)
                {
                    lead.last_contact = Some(now.date_naive());
                    if lead.status == LeadStatus::New {
                        lead.status = LeadStatus::Contacted;
                    }
                }
            }
            LedgerUpdate::AppendLog { kind, message } => {
                self.logs.insert(
                    0,
                    LogEntry {
                        time: now,
                        kind,
                        message,
                    },
                );
                self.logs.truncate(self.max_logs);
            }
            LedgerUpdate::ClearLogs => self.logs.clear(),
            LedgerUpdate::RecordMessage {
                phone,
                direction,
                text,
                name,
            } => {
                let key = digits_only(&phone);
                if key.is_empty() {
                    return Err(LedgerError::Invalid("phone has no digits".into()));
                }
                let thread = self.inbox.entry(key.clone()).or_insert_with(|| InboxThread {
                    name: if name.trim().is_empty() { key } else { name },
                    messages: Vec::new(),
                });
                thread.messages.push(InboxMessage {
                    direction,
                    text,
                    time: now,
                });
            }
            LedgerUpdate::CountDelivered => {
                self.metrics.sent += 1;
                self.metrics.delivered += 1;
            }
            LedgerUpdate::CountFailed => self.metrics.failed += 1,
        }
        Ok(())
    }

    // ============================================
    // Queries
    // ============================================

    /// Leads matching a search (name or phone) and a status filter
    pub fn find_leads(&self, query: &str, filter: StatusFilter) -> Vec<&Lead> {
        let query = query.trim().to_lowercase();
        self.leads
            .iter()
            .filter(|l| filter.matches(l.status))
            .filter(|l| {
                query.is_empty() || l.name.to_lowercase().contains(&query) || l.phone.contains(&query)
            })
            .collect()
    }

    pub fn lead_by_phone(&self, phone: &str) -> Option<&Lead> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            return None;
        }
        self.leads.iter().find(|l| l.phone_digits() == digits)
    }

    /// Campaign recipients for a status filter, in lead order
    ///
    /// Leads whose phone does not qualify for bulk sending are skipped.
    pub fn campaign_recipients(&self, filter: StatusFilter) -> Vec<Recipient> {
        self.leads
            .iter()
            .filter(|l| filter.matches(l.status))
            .filter_map(|l| Recipient::for_bulk(&l.phone))
            .collect()
    }

    /// Inbox threads matching `query` (phone or name), most messages first
    pub fn threads(&self, query: &str) -> Vec<ThreadSummary> {
        let query = query.trim().to_lowercase();
        let mut threads: Vec<ThreadSummary> = self
            .inbox
            .iter()
            .filter(|(phone, t)| {
                query.is_empty() || phone.contains(&query) || t.name.to_lowercase().contains(&query)
            })
            .map(|(phone, t)| ThreadSummary {
                phone: phone.clone(),
                name: t.name.clone(),
                message_count: t.messages.len(),
                last_text: t.last_message().map(|m| m.text.clone()),
                last_time: t.last_message().map(|m| m.time),
            })
            .collect();
        threads.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        threads
    }

    pub fn thread(&self, phone: &str) -> Option<&InboxThread> {
        self.inbox.get(&digits_only(phone))
    }

    // ============================================
    // Persistence
    // ============================================

    /// Load from a JSON file; a missing file is an empty ledger
    pub fn load(path: &Path, max_logs: usize) -> LedgerResult<Self> {
        if !path.exists() {
            return Ok(Self::with_max_logs(max_logs));
        }

        let content = std::fs::read_to_string(path)?;
        let mut ledger: Ledger = serde_json::from_str(&content)?;
        ledger.max_logs = max_logs;
        ledger.logs.truncate(max_logs);
        Ok(ledger)
    }

    /// Save to a JSON file, creating parent directories
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Shared, persisted ledger
pub struct LedgerStore {
    state: RwLock<Ledger>,
    path: Option<PathBuf>,
    /// Orders file writes; taken before the state lock is released
    writer: Mutex<()>,
}

impl LedgerStore {
    /// Open the ledger file at `path`
    pub fn open(path: impl Into<PathBuf>, max_logs: usize) -> LedgerResult<Self> {
        let path = path.into();
        let ledger = Ledger::load(&path, max_logs)?;
        tracing::info!(
            path = %path.display(),
            leads = ledger.leads.len(),
            threads = ledger.inbox.len(),
            "Ledger loaded"
        );
        Ok(Self {
            state: RwLock::new(ledger),
            path: Some(path),
            writer: Mutex::new(()),
        })
    }

    /// Ledger that is never written to disk
    pub fn in_memory(max_logs: usize) -> Self {
        Self {
            state: RwLock::new(Ledger::with_max_logs(max_logs)),
            path: None,
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply one update and persist
    pub async fn apply(&self, update: LedgerUpdate) -> LedgerResult<()> {
        self.apply_all(vec![update]).await
    }

    /// Apply updates in order, then persist once
    ///
    /// Stops at the first rejected update; earlier updates stay applied.
    pub async fn apply_all(&self, updates: Vec<LedgerUpdate>) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let mut outcome = Ok(());
        for update in updates {
            if let Err(e) = state.apply(update) {
                outcome = Err(e);
                break;
            }
        }

        let Some(path) = self.path.clone() else {
            return outcome;
        };

        // Write a copy off the async workers so readers are not held up by disk I/O
        let writer = self.writer.lock().await;
        let copy = state.clone();
        drop(state);

        let saved = tokio::task::spawn_blocking({
            let path = path.clone();
            move || copy.save(&path)
        })
        .await
        .unwrap_or_else(|e| {
            Err(LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            )))
        });
        drop(writer);

        if let Err(e) = saved {
            tracing::error!(path = %path.display(), error = %e, "Failed to persist ledger");
            return Err(e);
        }
        outcome
    }

    /// Run a read-only query against the current state
    pub async fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> Ledger {
        self.state.read().await.clone()
    }
}
