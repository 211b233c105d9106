//! On-air API server library.
//!
//! Exposes config, state, error handling, routes, background tasks and the
//! WebSocket change feed so integration tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
