//! Participation handlers: the four admission paths, status, and token
//! recovery.
//!
//! Anonymous and email-identified comment entries pass through the
//! verification gate before admission; login paths trust the identity
//! headers set by the auth proxy.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth;
use crate::api::dto::{
    ParticipateRequest, ParticipationResponse, RecoverRequest, StatusParams, StatusResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LotteryError};
use crate::service::validate_email;

/// `POST /activities/:name/participate` — Join anonymously by email.
///
/// # Errors
///
/// Returns [`LotteryError::InvalidInput`] on a missing or malformed
/// email, [`LotteryError::PrecheckFailed`] when the verification code
/// is missing or wrong, and the admission errors otherwise.
#[utoipa::path(
    post,
    path = "/api/v1/activities/{name}/participate",
    tag = "Participation",
    summary = "Participate anonymously",
    description = "Admits an email-identified entry. Requires a verification code when email verification is enabled. Instant-mode activities resolve the prize outcome inside the same call.",
    params(
        ("name" = String, Path, description = "Activity name"),
    ),
    request_body = ParticipateRequest,
    responses(
        (status = 200, description = "Participation recorded", body = ParticipationResponse),
        (status = 400, description = "Missing or malformed email", body = ErrorResponse),
        (status = 404, description = "Activity not found", body = ErrorResponse),
        (status = 409, description = "Not running, full, or duplicate", body = ErrorResponse),
        (status = 412, description = "Verification failed", body = ErrorResponse),
        (status = 422, description = "Admission rule mismatch", body = ErrorResponse),
        (status = 429, description = "Verification resend throttled", body = ErrorResponse),
    )
)]
pub async fn participate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ParticipateRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let email = required_email(&req)?;
    state
        .verification
        .require_verified(email, &name, req.verification_code.as_deref())
        .await?;

    let ip = auth::client_ip(&headers);
    let record = state
        .lottery
        .participate_anonymous(&name, email, req.display_name.as_deref(), &ip)
        .await?;
    Ok(Json(ParticipationResponse::from(record)))
}

/// `GET /activities/:name/status` — Check a token's participation.
///
/// Unknown activities and tokens report as not participated rather
/// than erroring, so the endpoint is safe to poll from public pages.
#[utoipa::path(
    get,
    path = "/api/v1/activities/{name}/status",
    tag = "Participation",
    summary = "Check participation status",
    description = "Looks up a participation token and reports whether it joined this activity and whether it won. Never returns 404: unknown tokens read as not participated.",
    params(
        ("name" = String, Path, description = "Activity name"),
        ("token" = Option<String>, Query, description = "Participation token"),
    ),
    responses(
        (status = 200, description = "Participation status", body = StatusResponse),
    )
)]
pub async fn participation_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<StatusParams>,
) -> impl IntoResponse {
    let status = state.lottery.participation_status(&name, &params.token).await;
    Json(StatusResponse::from(status))
}

/// `POST /activities/:name/participate/comment` — Join with a comment
/// precheck, authenticated or by email.
///
/// # Errors
///
/// Returns [`LotteryError::PrecheckFailed`] when no qualifying comment
/// exists or verification fails, and the admission errors otherwise.
#[utoipa::path(
    post,
    path = "/api/v1/activities/{name}/participate/comment",
    tag = "Participation",
    summary = "Participate via comment",
    description = "Admits an entry that commented on the target post. Authenticated callers are matched by username; anonymous callers supply an email, pass verification, and are matched by comment email.",
    params(
        ("name" = String, Path, description = "Activity name"),
    ),
    request_body = ParticipateRequest,
    responses(
        (status = 200, description = "Participation recorded", body = ParticipationResponse),
        (status = 400, description = "Missing target post or malformed email", body = ErrorResponse),
        (status = 404, description = "Activity not found", body = ErrorResponse),
        (status = 409, description = "Not running, full, or duplicate", body = ErrorResponse),
        (status = 412, description = "No qualifying comment or verification failed", body = ErrorResponse),
        (status = 422, description = "Admission rule mismatch", body = ErrorResponse),
    )
)]
pub async fn participate_comment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ParticipateRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let principal = auth::principal_from_headers(&headers);
    let ip = auth::client_ip(&headers);

    let record = if principal.is_some() {
        state
            .lottery
            .participate_comment(&name, principal.as_ref(), req.post.as_deref(), &ip)
            .await?
    } else {
        let email = required_email(&req)?;
        state
            .verification
            .require_verified(email, &name, req.verification_code.as_deref())
            .await?;
        state
            .lottery
            .participate_comment_by_email(&name, email, req.post.as_deref(), &ip)
            .await?
    };
    Ok(Json(ParticipationResponse::from(record)))
}

/// `POST /activities/:name/participate/login` — Join with the proxied
/// login identity.
async fn participate_login(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, LotteryError> {
    let principal = auth::principal_from_headers(&headers);
    let ip = auth::client_ip(&headers);
    let record = state
        .lottery
        .participate_login(&name, principal.as_ref(), &ip)
        .await?;
    Ok(Json(ParticipationResponse::from(record)))
}

/// `POST /activities/:name/participate/login-comment` — Join with both
/// the login identity and the comment precheck.
async fn participate_login_comment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ParticipateRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let principal = auth::principal_from_headers(&headers);
    let ip = auth::client_ip(&headers);
    let record = state
        .lottery
        .participate_login_comment(&name, principal.as_ref(), req.post.as_deref(), &ip)
        .await?;
    Ok(Json(ParticipationResponse::from(record)))
}

/// `POST /activities/:name/recover` — Recover a lost token by email.
async fn recover(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RecoverRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let record = state.lottery.recover_token(&name, req.email.trim()).await?;
    Ok(Json(ParticipationResponse::from(record)))
}

/// Pulls the trimmed email out of the request and validates its shape.
fn required_email(req: &ParticipateRequest) -> Result<&str, LotteryError> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| LotteryError::InvalidInput("email is required on this path".to_string()))?;
    validate_email(email)?;
    Ok(email)
}

/// Participation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/activities/{name}/participate", post(participate))
        .route("/activities/{name}/participate/login", post(participate_login))
        .route(
            "/activities/{name}/participate/comment",
            post(participate_comment),
        )
        .route(
            "/activities/{name}/participate/login-comment",
            post(participate_login_comment),
        )
        .route("/activities/{name}/status", get(participation_status))
        .route("/activities/{name}/recover", post(recover))
}
