//! REST endpoint handlers organized by resource.

pub mod account;
pub mod activity;
pub mod comment;
pub mod participation;
pub mod system;
pub mod verification;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(activity::routes())
        .merge(participation::routes())
        .merge(verification::routes())
        .merge(comment::routes())
        .merge(account::routes())
}
