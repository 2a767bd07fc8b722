//! Local Ledger
//!
//! Leads, activity logs, inbox threads and send metrics, held in one state
//! struct and persisted as JSON:
//!
//! - **types**: Record types (Lead, LogEntry, InboxThread, MessageMetrics)
//! - **store**: The `Ledger` reducer and the shared `LedgerStore`
//! - **reporter**: Ledger effects of single sends and batch attempts
//! - **error**: Error types

pub mod error;
pub mod reporter;
pub mod store;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use reporter::{record_single, LedgerReporter};
pub use store::{Ledger, LedgerStore, LedgerUpdate, DEFAULT_MAX_LOGS};
pub use types::{
    Direction, InboxMessage, InboxThread, Lead, LeadStatus, LogEntry, LogKind, MessageMetrics,
    StatusFilter, ThreadSummary,
};
