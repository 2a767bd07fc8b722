//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::ledger::LedgerStore;
use crate::messaging::{
    BatchRunner, CancelFlag, Dispatcher, GraphClient, HttpTransport, TemplateDefinition,
};
use crate::websocket::{HubConfig, ProgressHub};

/// Shared application state for all handlers
pub struct AppState {
    /// Full server configuration
    pub config: Arc<Config>,
    /// Graph API client holding the WhatsApp token
    pub graph: Arc<GraphClient>,
    pub dispatcher: Dispatcher,
    pub runner: BatchRunner,
    pub ledger: Arc<LedgerStore>,
    /// Last template list fetched from the Graph catalog
    pub catalog: RwLock<Vec<TemplateDefinition>>,
    /// The single batch slot
    pub batch: BatchSlot,
    /// Progress fan-out for WebSocket viewers
    pub hub: Arc<ProgressHub>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire the state from configuration, a transport and an opened ledger
    pub fn new(config: Config, transport: Arc<dyn HttpTransport>, ledger: LedgerStore) -> Self {
        let graph = Arc::new(GraphClient::new(transport, config.whatsapp.graph()));
        let dispatcher = Dispatcher::new(Arc::clone(&graph));
        let runner = BatchRunner::new(dispatcher.clone(), config.batch.runner_config());

        Self {
            config: Arc::new(config),
            graph,
            dispatcher,
            runner,
            ledger: Arc::new(ledger),
            catalog: RwLock::new(Vec::new()),
            batch: BatchSlot::default(),
            hub: Arc::new(ProgressHub::new(HubConfig::default())),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Cached catalog, fetched once if still empty
    ///
    /// A failed fetch leaves the cache empty; callers fall back to the
    /// supplied values.
    pub async fn catalog(&self) -> Vec<TemplateDefinition> {
        {
            let cached = self.catalog.read().await;
            if !cached.is_empty() {
                return cached.clone();
            }
        }

        match self.graph.list_templates().await {
            Ok(templates) => {
                *self.catalog.write().await = templates.clone();
                templates
            }
            Err(e) => {
                tracing::warn!(error = %e, "Template catalog unavailable");
                Vec::new()
            }
        }
    }

    /// Replace the cached catalog
    pub async fn store_catalog(&self, templates: Vec<TemplateDefinition>) {
        *self.catalog.write().await = templates;
    }
}

/// Guard allowing one batch at a time
#[derive(Default)]
pub struct BatchSlot {
    running: Arc<AtomicBool>,
    cancel: Mutex<CancelFlag>,
}

impl BatchSlot {
    /// Claim the slot for a new run
    ///
    /// `None` when a batch is already running. The slot stays claimed until
    /// the returned lease is dropped.
    pub fn try_start(&self) -> Option<BatchLease> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let flag = CancelFlag::new();
        *self.cancel.lock() = flag.clone();
        Some(BatchLease {
            running: Arc::clone(&self.running),
            cancel: flag,
        })
    }

    /// Request cancellation of the running batch
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel.lock().cancel();
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Claim on the batch slot, released on drop
///
/// Dropping during a panic unwind also frees the slot.
pub struct BatchLease {
    running: Arc<AtomicBool>,
    cancel: CancelFlag,
}

impl BatchLease {
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}

impl Drop for BatchLease {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
