//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams lottery events to clients,
//! filtered per connection by activity-name subscriptions.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
