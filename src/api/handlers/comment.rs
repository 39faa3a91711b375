//! Comment handlers: ingestion into the directory and the precheck
//! endpoint participation pages poll before enabling the join button.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::auth;
use crate::api::dto::{
    CommentCheckParams, CommentCheckResponse, CommentIngestRequest, CommentIngestResponse,
};
use crate::app_state::AppState;
use crate::domain::{CommentAuthor, CommentRecord};
use crate::error::LotteryError;
use crate::service::validate_email;

/// `POST /comments` — Mirror a comment into the directory.
///
/// The author is identified by exactly one of `email` and `username`:
/// anonymous comments carry an email, authenticated ones a username.
async fn ingest_comment(
    State(state): State<AppState>,
    Json(req): Json<CommentIngestRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let post = req.post.trim();
    if post.is_empty() {
        return Err(LotteryError::InvalidInput("post is required".to_string()));
    }

    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|username| !username.is_empty());
    let author = match (email, username) {
        (Some(email), None) => {
            validate_email(email)?;
            CommentAuthor::Email(email.to_string())
        }
        (None, Some(username)) => CommentAuthor::User(username.to_string()),
        _ => {
            return Err(LotteryError::InvalidInput(
                "exactly one of email and username identifies the author".to_string(),
            ));
        }
    };

    let id = req
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);

    let record = CommentRecord {
        id: id.clone(),
        post: post.to_string(),
        author,
        display_name: req
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        created_at: Utc::now(),
    };
    state.comments.ingest(record).await;

    Ok((StatusCode::CREATED, Json(CommentIngestResponse { id })))
}

/// `GET /comments/check` — Report whether the caller has commented on
/// a post, by login identity or by email.
async fn check_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CommentCheckParams>,
) -> Result<impl IntoResponse, LotteryError> {
    let post = params.post.trim();
    if post.is_empty() {
        return Err(LotteryError::InvalidInput("post is required".to_string()));
    }

    let principal = auth::principal_from_headers(&headers);
    let check = state
        .lottery
        .check_comment(post, principal.as_ref(), params.email.as_deref())
        .await;
    Ok(Json(CommentCheckResponse {
        has_commented: check.has_commented,
        logged_in: check.logged_in,
    }))
}

/// Comment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments", post(ingest_comment))
        .route("/comments/check", get(check_comment))
}
