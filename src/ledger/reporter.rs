//! Ledger effects of sends
//!
//! Successful sends count as delivered, stamp the matching lead and append
//! an outbound inbox entry. Failures are counted and logged.

use async_trait::async_trait;
use std::sync::Arc;

use super::store::{LedgerStore, LedgerUpdate};
use super::types::{Direction, LogKind};
use crate::messaging::batch::{BatchKind, BatchReporter};
use crate::messaging::types::{BatchResult, DispatchOutcome, OutboundMessage, Recipient};

/// Inbox name used when no lead matches the recipient
fn fallback_name(kind: Option<BatchKind>) -> &'static str {
    match kind {
        Some(BatchKind::Broadcast) => "Broadcast Recipient",
        _ => "Lead",
    }
}

/// Updates recorded for a successful send
pub async fn success_updates(
    ledger: &LedgerStore,
    recipient: &Recipient,
    message: &OutboundMessage,
    kind: Option<BatchKind>,
) -> Vec<LedgerUpdate> {
    let name = ledger
        .read(|l| l.lead_by_phone(recipient.digits()).map(|lead| lead.name.clone()))
        .await
        .unwrap_or_else(|| fallback_name(kind).to_string());

    vec![
        LedgerUpdate::CountDelivered,
        LedgerUpdate::MarkContacted {
            phone: recipient.digits().to_string(),
        },
        LedgerUpdate::RecordMessage {
            phone: recipient.digits().to_string(),
            direction: Direction::Out,
            text: message.summary(),
            name,
        },
    ]
}

/// Record a single (non-batch) send
pub async fn record_single(
    ledger: &LedgerStore,
    recipient: &Recipient,
    message: &OutboundMessage,
    outcome: &DispatchOutcome,
) {
    let updates = match outcome {
        DispatchOutcome::Success { .. } => {
            let mut updates = success_updates(ledger, recipient, message, None).await;
            updates.push(LedgerUpdate::log(
                LogKind::Success,
                format!("Message sent to {}", recipient),
            ));
            updates
        }
        DispatchOutcome::Failure { reason } => vec![
            LedgerUpdate::CountFailed,
            LedgerUpdate::log(LogKind::Error, format!("Failed: {}", reason)),
        ],
    };

    if let Err(e) = ledger.apply_all(updates).await {
        tracing::warn!(error = %e, "Failed to record send in ledger");
    }
}

/// Batch reporter that writes into the ledger
pub struct LedgerReporter {
    ledger: Arc<LedgerStore>,
    kind: BatchKind,
}

impl LedgerReporter {
    pub fn new(ledger: Arc<LedgerStore>, kind: BatchKind) -> Self {
        Self { ledger, kind }
    }

    async fn apply(&self, updates: Vec<LedgerUpdate>) {
        if let Err(e) = self.ledger.apply_all(updates).await {
            tracing::warn!(kind = %self.kind, error = %e, "Failed to record batch attempt");
        }
    }
}

#[async_trait]
impl BatchReporter for LedgerReporter {
    async fn on_success(&self, recipient: &Recipient, message: &OutboundMessage) {
        let updates = success_updates(&self.ledger, recipient, message, Some(self.kind)).await;
        self.apply(updates).await;
    }

    async fn on_failure(&self, recipient: &Recipient, reason: &str) {
        let target = match self.kind {
            BatchKind::Campaign => self
                .ledger
                .read(|l| l.lead_by_phone(recipient.digits()).map(|lead| lead.name.clone()))
                .await
                .unwrap_or_else(|| recipient.to_string()),
            BatchKind::Broadcast => recipient.to_string(),
        };

        self.apply(vec![
            LedgerUpdate::CountFailed,
            LedgerUpdate::log(
                LogKind::Error,
                format!("{} failed for {}: {}", self.kind, target, reason),
            ),
        ])
        .await;
    }

    async fn on_finish(&self, result: &BatchResult) {
        let message = if result.cancelled {
            format!(
                "{} cancelled: {} sent, {} failed, {} skipped",
                self.kind,
                result.succeeded,
                result.failed,
                result.total - result.attempted
            )
        } else {
            format!(
                "{} finished: {} sent, {} failed",
                self.kind, result.succeeded, result.failed
            )
        };
        let kind = if result.cancelled {
            LogKind::Info
        } else {
            LogKind::Success
        };
        self.apply(vec![LedgerUpdate::log(kind, message)]).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{Lead, LeadStatus};

    fn recipient(phone: &str) -> Recipient {
        Recipient::from_phone(phone).unwrap()
    }

    #[tokio::test]
    async fn test_campaign_success_uses_lead_name() {
        let ledger = Arc::new(LedgerStore::in_memory(20));
        ledger
            .apply(LedgerUpdate::AddLead(Lead::new("Ana", "+111 111", LeadStatus::New)))
            .await
            .unwrap();

        let reporter = LedgerReporter::new(ledger.clone(), BatchKind::Campaign);
        reporter
            .on_success(&recipient("111111"), &OutboundMessage::template("promo", "en", vec![]))
            .await;

        let state = ledger.snapshot().await;
        assert_eq!(state.metrics.sent, 1);
        assert_eq!(state.leads[0].status, LeadStatus::Contacted);
        let thread = state.thread("111111").unwrap();
        assert_eq!(thread.name, "Ana");
        assert_eq!(thread.messages[0].text, "Template: promo");
    }

    #[tokio::test]
    async fn test_broadcast_failure_and_summary() {
        let ledger = Arc::new(LedgerStore::in_memory(20));
        let reporter = LedgerReporter::new(ledger.clone(), BatchKind::Broadcast);

        reporter.on_failure(&recipient("222222"), "bad number").await;
        reporter
            .on_finish(&BatchResult {
                total: 2,
                attempted: 2,
                succeeded: 1,
                failed: 1,
                cancelled: false,
            })
            .await;

        let state = ledger.snapshot().await;
        assert_eq!(state.metrics.failed, 1);
        assert_eq!(state.logs[0].message, "Broadcast finished: 1 sent, 1 failed");
        assert_eq!(state.logs[1].message, "Broadcast failed for 222222: bad number");
        assert_eq!(state.logs[1].kind, LogKind::Error);
    }

    #[tokio::test]
    async fn test_record_single() {
        let ledger = LedgerStore::in_memory(20);
        let to = recipient("333333");

        record_single(
            &ledger,
            &to,
            &OutboundMessage::text("hello"),
            &DispatchOutcome::Success { message_id: None },
        )
        .await;
        record_single(
            &ledger,
            &to,
            &OutboundMessage::text("hello"),
            &DispatchOutcome::failure("boom"),
        )
        .await;

        let state = ledger.snapshot().await;
        assert_eq!(state.metrics.delivered, 1);
        assert_eq!(state.metrics.failed, 1);
        assert_eq!(state.logs[0].message, "Failed: boom");
        assert_eq!(state.logs[1].message, "Message sent to 333333");
        assert_eq!(state.thread("333333").unwrap().name, "Lead");
    }
}
