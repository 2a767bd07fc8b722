//! API Routes
//!
//! Route handlers organized by functionality.

pub mod batch;
pub mod health;
pub mod leads;
pub mod ledger;
pub mod messages;
pub mod relay;
pub mod templates;
