//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{CommentDirectory, EventBus};
use crate::service::{LotteryService, VerificationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Lottery service for activity and participation logic.
    pub lottery: Arc<LotteryService>,
    /// Verification gate for email-identified paths.
    pub verification: Arc<VerificationService>,
    /// Comment directory backing the precheck endpoints.
    pub comments: Arc<CommentDirectory>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
