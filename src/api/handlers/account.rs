//! Account handlers: the caller's own participation history, resolved
//! from the proxied login identity.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth;
use crate::api::dto::ParticipantRecordDto;
use crate::app_state::AppState;

/// `GET /me/participations` — Every record belonging to the caller.
///
/// Anonymous callers get an empty list rather than an error, so the
/// frontend can render the same page for both.
async fn my_participations(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(principal) = auth::principal_from_headers(&headers) else {
        return Json(Vec::<ParticipantRecordDto>::new());
    };
    let records = state.lottery.my_participations(&principal).await;
    Json(
        records
            .into_iter()
            .map(ParticipantRecordDto::from)
            .collect::<Vec<_>>(),
    )
}

/// `GET /me/winnings` — The caller's winning records only.
async fn my_winnings(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(principal) = auth::principal_from_headers(&headers) else {
        return Json(Vec::<ParticipantRecordDto>::new());
    };
    let records = state.lottery.my_winnings(&principal).await;
    Json(
        records
            .into_iter()
            .map(ParticipantRecordDto::from)
            .collect::<Vec<_>>(),
    )
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/participations", get(my_participations))
        .route("/me/winnings", get(my_winnings))
}
