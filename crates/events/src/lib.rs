//! Change notification for the playout engine.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. The engine publishes after every
//!   successful flush and knows nothing about subscribers.
//! - [`PlayoutEvent`]: the event envelope.
//! - [`delivery`]: pushes new timelines to device gateways.

pub mod bus;
pub mod delivery;

pub use bus::{event_types, EventBus, PlayoutEvent};
pub use delivery::gateway::{GatewayDelivery, GatewayEndpoint};
