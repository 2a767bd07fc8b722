//! Batch Runner
//!
//! Sends the same message to a list of recipients. Attempts are dispatched
//! in input order through an order-preserving buffer whose width is the
//! configured concurrency (1 by default, which makes the run strictly
//! serial). A single failure never aborts the run.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::dispatcher::Dispatcher;
use super::types::{BatchResult, DispatchOutcome, OutboundMessage, Recipient};

/// Errors raised before a batch starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("no recipients")]
    NoRecipients,
}

/// Which flow started the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    /// Pasted number list
    Broadcast,
    /// Leads filtered by status
    Campaign,
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchKind::Broadcast => write!(f, "Broadcast"),
            BatchKind::Campaign => write!(f, "Campaign"),
        }
    }
}

/// Pacing for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Attempts in flight at once
    pub concurrency: usize,
    /// Pause after each attempt, skipped after the last one
    pub delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            delay: Duration::from_millis(100),
        }
    }
}

/// Progress after one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub attempted: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<&BatchResult> for BatchProgress {
    fn from(result: &BatchResult) -> Self {
        Self {
            attempted: result.attempted,
            total: result.total,
            succeeded: result.succeeded,
            failed: result.failed,
        }
    }
}

/// Receives per-attempt callbacks during a run
///
/// Every method defaults to a no-op.
#[async_trait]
pub trait BatchReporter: Send + Sync {
    async fn on_success(&self, _recipient: &Recipient, _message: &OutboundMessage) {}

    async fn on_failure(&self, _recipient: &Recipient, _reason: &str) {}

    async fn on_progress(&self, _progress: BatchProgress) {}

    async fn on_finish(&self, _result: &BatchResult) {}
}

#[async_trait]
impl BatchReporter for () {}

/// Cooperative stop signal, checked between attempts
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one message against many recipients
#[derive(Clone)]
pub struct BatchRunner {
    dispatcher: Dispatcher,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(dispatcher: Dispatcher, config: BatchConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Dispatch `message` to every recipient
    ///
    /// Fails only when the list is empty; per-recipient failures are counted
    /// and reported. The reporter sees each outcome and a progress update
    /// before the inter-attempt delay starts.
    pub async fn run<R>(
        &self,
        message: &OutboundMessage,
        recipients: &[Recipient],
        reporter: &R,
        cancel: &CancelFlag,
    ) -> Result<BatchResult, BatchError>
    where
        R: BatchReporter + ?Sized,
    {
        if recipients.is_empty() {
            return Err(BatchError::NoRecipients);
        }

        let total = recipients.len();
        let mut result = BatchResult::new(total);

        tracing::info!(
            total,
            kind = message.kind(),
            concurrency = self.config.concurrency,
            "Batch started"
        );

        // Attempt futures own their inputs; nothing borrowed crosses the stream
        let shared = Arc::new(message.clone());
        let dispatcher = self.dispatcher.clone();
        let flag = cancel.clone();
        let mut attempts = stream::iter(recipients.to_vec())
            .map(move |recipient| {
                let dispatcher = dispatcher.clone();
                let message = Arc::clone(&shared);
                let flag = flag.clone();
                async move {
                    if flag.is_cancelled() {
                        return (recipient, None);
                    }
                    let outcome = dispatcher.send(&message, &recipient).await;
                    (recipient, Some(outcome))
                }
            })
            .buffered(self.config.concurrency.max(1));

        while let Some((recipient, outcome)) = attempts.next().await {
            let Some(outcome) = outcome else {
                break;
            };
            result.record(&outcome);

            match &outcome {
                DispatchOutcome::Success { .. } => reporter.on_success(&recipient, message).await,
                DispatchOutcome::Failure { reason } => {
                    reporter.on_failure(&recipient, reason).await
                }
            }

            let progress = BatchProgress::from(&result);
            tracing::debug!(
                attempted = progress.attempted,
                total = progress.total,
                succeeded = progress.succeeded,
                failed = progress.failed,
                "Batch progress"
            );
            reporter.on_progress(progress).await;

            if !result.is_complete() && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }
        }

        result.cancelled = !result.is_complete();

        if result.cancelled {
            tracing::warn!(
                attempted = result.attempted,
                total,
                "Batch cancelled"
            );
        } else {
            tracing::info!(
                succeeded = result.succeeded,
                failed = result.failed,
                "Batch finished"
            );
        }

        reporter.on_finish(&result).await;
        Ok(result)
    }
}
