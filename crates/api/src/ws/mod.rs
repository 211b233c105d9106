//! WebSocket change feed.
//!
//! Clients connect to `/api/v1/ws`, optionally narrowed to one playlist or
//! studio, and receive every matching engine event as a JSON text frame.

pub mod feed;
mod handler;
mod heartbeat;
pub mod manager;

pub use feed::run_feed;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{Subscription, WsManager};
