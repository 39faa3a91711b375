//! # lottery-gateway
//!
//! REST API and WebSocket gateway for running lottery activities:
//! participation windows, admission rules, and a weighted prize
//! allocation engine.
//!
//! All live state lives in a concurrent in-memory store; PostgreSQL is
//! a durable shadow the store is restored from on boot. Clients follow
//! draws in real time over the WebSocket event stream.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── LotteryService, VerificationService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── LotteryStore, CommentDirectory (domain/)
//!     ├── Draw engine (domain/draw)
//!     │
//!     └── PostgreSQL Persistence
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
