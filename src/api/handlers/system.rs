//! System endpoints: health check and configuration catalogs.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported allocation mode info.
#[derive(Debug, Serialize, ToSchema)]
struct ModeInfo {
    mode: &'static str,
    description: &'static str,
    instant: bool,
}

/// `GET /config/modes` — List supported allocation modes.
#[utoipa::path(
    get,
    path = "/config/modes",
    tag = "System",
    summary = "List supported allocation modes",
    description = "Returns metadata for every prize allocation mode an activity can be created with.",
    responses(
        (status = 200, description = "Allocation mode catalog", body = Vec<ModeInfo>),
    )
)]
pub async fn modes_handler() -> impl IntoResponse {
    let modes = vec![
        ModeInfo {
            mode: "scheduled",
            description: "Batch draw at the configured draw moment",
            instant: false,
        },
        ModeInfo {
            mode: "wheel",
            description: "Instant wheel spin resolved at participation time",
            instant: true,
        },
        ModeInfo {
            mode: "draw",
            description: "Instant ticket draw resolved at participation time",
            instant: true,
        },
    ];
    (StatusCode::OK, Json(modes))
}

/// Supported admission rule info.
#[derive(Debug, Serialize, ToSchema)]
struct RuleInfo {
    rule: &'static str,
    description: &'static str,
    requires_login: bool,
    requires_comment: bool,
}

/// `GET /config/rules` — List supported admission rules.
#[utoipa::path(
    get,
    path = "/config/rules",
    tag = "System",
    summary = "List supported admission rules",
    description = "Returns metadata for every admission rule an activity can require of its participants.",
    responses(
        (status = 200, description = "Admission rule catalog", body = Vec<RuleInfo>),
    )
)]
pub async fn rules_handler() -> impl IntoResponse {
    let rules = vec![
        RuleInfo {
            rule: "none",
            description: "Open to anonymous email-identified entries",
            requires_login: false,
            requires_comment: false,
        },
        RuleInfo {
            rule: "login",
            description: "Requires the proxied login identity",
            requires_login: true,
            requires_comment: false,
        },
        RuleInfo {
            rule: "comment",
            description: "Requires a comment on the target post",
            requires_login: false,
            requires_comment: true,
        },
        RuleInfo {
            rule: "login_and_comment",
            description: "Requires both the login identity and a comment",
            requires_login: true,
            requires_comment: true,
        },
    ];
    (StatusCode::OK, Json(rules))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/modes", get(modes_handler))
        .route("/config/rules", get(rules_handler))
}
