//! Activity management handlers: create, list, get, draw, participants.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ActivityFilterParams, ActivityListResponse, ActivitySummaryDto, ActivityView,
    CreateActivityRequest, DrawResponse, PaginationMeta, PaginationParams,
    ParticipantListResponse, ParticipantRecordDto,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LotteryError};

/// `POST /activities` — Create a new lottery activity.
///
/// # Errors
///
/// Returns [`LotteryError::InvalidInput`] on a blank name or title, an
/// inverted window, or a taken name.
#[utoipa::path(
    post,
    path = "/api/v1/activities",
    tag = "Activities",
    summary = "Create a lottery activity",
    description = "Registers an activity with its participation window, admission rule, prize table, and allocation mode. The lifecycle state is derived from the window on every read.",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity created", body = ActivityView),
        (status = 400, description = "Invalid activity definition", body = ErrorResponse),
    )
)]
pub async fn create_activity(
    State(state): State<AppState>,
    Json(req): Json<CreateActivityRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let (name, spec) = req.into_spec();
    let activity = state.lottery.create_activity(&name, spec).await?;
    Ok((StatusCode::CREATED, Json(ActivityView::from(activity))))
}

/// `GET /activities` — List activities with filters and pagination.
///
/// # Errors
///
/// Returns [`LotteryError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/activities",
    tag = "Activities",
    summary = "List activities",
    description = "Returns a paginated list of activities, newest first, optionally filtered by keyword, lifecycle state, and admission rule. Listing refreshes derived states but never triggers a draw.",
    params(
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("per_page" = Option<u32>, Query, description = "Items per page (max 100)"),
        ("keyword" = Option<String>, Query, description = "Substring match on name and title"),
        ("state" = Option<String>, Query, description = "Lifecycle state filter (pending, running, ended, drawn)"),
        ("rule" = Option<String>, Query, description = "Admission rule filter (none, login, comment, login_and_comment)"),
    ),
    responses(
        (status = 200, description = "Paginated activity list", body = ActivityListResponse),
    )
)]
pub async fn list_activities(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ActivityFilterParams>,
) -> Result<impl IntoResponse, LotteryError> {
    let summaries = state.lottery.list_activities(&filter.into_filter()).await;

    let total = u32::try_from(summaries.len()).unwrap_or(u32::MAX);
    let meta = PaginationMeta::for_total(&pagination, total);
    let (skip, take) = pagination.window();
    let data: Vec<ActivitySummaryDto> = summaries
        .into_iter()
        .skip(skip)
        .take(take)
        .map(ActivitySummaryDto::from)
        .collect();

    Ok(Json(ActivityListResponse {
        data,
        pagination: meta,
    }))
}

/// `GET /activities/:name` — Get the current activity view.
///
/// # Errors
///
/// Returns [`LotteryError::NotFound`] for an unknown activity, or the
/// draw errors when a due batch draw cannot run.
#[utoipa::path(
    get,
    path = "/api/v1/activities/{name}",
    tag = "Activities",
    summary = "Get activity details",
    description = "Returns the full activity view with a freshly derived lifecycle state. When the draw moment has passed, the batch draw runs before the view is taken.",
    params(
        ("name" = String, Path, description = "Activity name"),
    ),
    responses(
        (status = 200, description = "Activity details", body = ActivityView),
        (status = 404, description = "Activity not found", body = ErrorResponse),
        (status = 422, description = "Due draw could not run", body = ErrorResponse),
    )
)]
pub async fn get_activity(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, LotteryError> {
    let activity = state.lottery.get_activity(&name).await?;
    Ok(Json(ActivityView::from(activity)))
}

/// `POST /activities/:name/draw` — Run the batch draw on demand.
///
/// # Errors
///
/// Returns [`LotteryError::AlreadyDrawn`] for a drawn activity,
/// [`LotteryError::NotRunning`] for a pending one, and the draw errors
/// when prizes or participants are missing.
#[utoipa::path(
    post,
    path = "/api/v1/activities/{name}/draw",
    tag = "Activities",
    summary = "Draw an activity",
    description = "Runs the weighted batch draw immediately. Drawing a running activity closes it early; a drawn activity cannot be drawn again.",
    params(
        ("name" = String, Path, description = "Activity name"),
    ),
    responses(
        (status = 200, description = "Draw completed", body = DrawResponse),
        (status = 404, description = "Activity not found", body = ErrorResponse),
        (status = 409, description = "Already drawn or not yet open", body = ErrorResponse),
        (status = 422, description = "No prizes or no participants", body = ErrorResponse),
    )
)]
pub async fn draw_activity(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, LotteryError> {
    let activity = state.lottery.draw(&name).await?;
    let winner_count = u32::try_from(activity.status.winners.len()).unwrap_or(u32::MAX);
    Ok(Json(DrawResponse {
        activity: activity.name,
        winner_count,
        drawn_at: activity.status.drawn_at,
    }))
}

/// `GET /activities/:name/participants` — List participation records.
///
/// # Errors
///
/// Returns [`LotteryError::NotFound`] for an unknown activity.
#[utoipa::path(
    get,
    path = "/api/v1/activities/{name}/participants",
    tag = "Activities",
    summary = "List participants",
    description = "Returns the paginated participation records of an activity, including instant-draw outcomes.",
    params(
        ("name" = String, Path, description = "Activity name"),
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("per_page" = Option<u32>, Query, description = "Items per page (max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated participant list", body = ParticipantListResponse),
        (status = 404, description = "Activity not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, LotteryError> {
    let records = state.lottery.list_participants(&name).await?;

    let total = u32::try_from(records.len()).unwrap_or(u32::MAX);
    let meta = PaginationMeta::for_total(&pagination, total);
    let (skip, take) = pagination.window();
    let data: Vec<ParticipantRecordDto> = records
        .into_iter()
        .skip(skip)
        .take(take)
        .map(ParticipantRecordDto::from)
        .collect();

    Ok(Json(ParticipantListResponse {
        data,
        pagination: meta,
    }))
}

/// Activity management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/activities", post(create_activity).get(list_activities))
        .route("/activities/{name}", get(get_activity))
        .route("/activities/{name}/draw", post(draw_activity))
        .route("/activities/{name}/participants", get(list_participants))
}
