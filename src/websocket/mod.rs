//! WebSocket Batch Progress
//!
//! Streams broadcast and campaign progress to connected viewers.
//!
//! ## Architecture
//!
//! - **ProgressHub**: Holds the latest batch snapshot and fans events out
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws` and receive `connected`, then a `snapshot`.
//! While a batch runs every attempt produces an `attempt` event followed by
//! a fresh `snapshot`. Clients may send `{"type": "status"}` or
//! `{"type": "ping"}` at any time.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:4000/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') console.log(msg.snapshot.attempted, msg.snapshot.total);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{HubConfig, HubError, ProgressHub, SharedHub};
pub use messages::{BatchPhase, BatchSnapshot, ClientMessage, ServerMessage};
