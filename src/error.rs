//! Gateway error types with HTTP status code mapping.
//!
//! [`LotteryError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ActivityState, ParticipationRule};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4004,
///     "message": "already participated in this activity",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`LotteryError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                      |
/// |-----------|--------------------|----------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request                  |
/// | 2000–2999 | Not Found          | 404 Not Found                    |
/// | 3000–3999 | Server             | 500 Internal Server Error        |
/// | 4000–4999 | Admission/Draw     | 409 Conflict / 412 / 422         |
#[derive(Debug, thiserror::Error)]
pub enum LotteryError {
    /// Request validation failed (malformed email, blank field, bad filter).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Activity or participation record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request arrived on a participation path the activity does not accept.
    #[error("activity requires {required} participation")]
    RuleMismatch {
        /// The participation rule the activity is configured with.
        required: ParticipationRule,
    },

    /// The activity is not accepting participations in its current state.
    #[error("activity is not running (state: {state})")]
    NotRunning {
        /// The state the activity was in when the request was rejected.
        state: ActivityState,
    },

    /// The activity reached its participant limit.
    #[error("participant limit reached")]
    CapacityExceeded,

    /// The caller already holds a participation record for this activity.
    #[error("already participated in this activity")]
    DuplicateParticipation,

    /// A path-specific precondition failed (missing login, missing comment,
    /// unverified email).
    #[error("precondition not met: {0}")]
    PrecheckFailed(String),

    /// A draw was requested on an activity with no prizes configured.
    #[error("activity has no prizes configured")]
    NoPrizesConfigured,

    /// A draw was requested on an activity with no participants.
    #[error("activity has no participants")]
    NoParticipants,

    /// A draw was requested on an activity whose draw already ran.
    #[error("activity already drawn")]
    AlreadyDrawn,

    /// Client exceeded a rate limit (verification code resend interval).
    #[error("rate limit exceeded; retry after {retry_after_secs} s")]
    RateLimited {
        /// Seconds until the client may retry.
        retry_after_secs: u64,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidInput(_) => 1001,
            Self::NotFound(_) => 2001,
            Self::RuleMismatch { .. } => 4001,
            Self::NotRunning { .. } => 4002,
            Self::CapacityExceeded => 4003,
            Self::DuplicateParticipation => 4004,
            Self::PrecheckFailed(_) => 4005,
            Self::NoPrizesConfigured => 4006,
            Self::NoParticipants => 4007,
            Self::AlreadyDrawn => 4008,
            Self::RateLimited { .. } => 429,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RuleMismatch { .. } | Self::NoPrizesConfigured | Self::NoParticipants => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotRunning { .. }
            | Self::CapacityExceeded
            | Self::DuplicateParticipation
            | Self::AlreadyDrawn => StatusCode::CONFLICT,
            Self::PrecheckFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LotteryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
