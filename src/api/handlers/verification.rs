//! Verification endpoints: code issuing and feature discovery.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{SendCodeRequest, SendCodeResponse, VerificationEnabledResponse};
use crate::app_state::AppState;
use crate::error::LotteryError;
use crate::service::{validate_email, SendOutcome};

/// `POST /verification/send-code` — Issue a verification code.
///
/// The code itself is delivered out of band and never echoed in the
/// response.
async fn send_code(
    State(state): State<AppState>,
    Json(req): Json<SendCodeRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let email = req.email.trim();
    validate_email(email)?;
    let activity = req.activity.trim();
    if activity.is_empty() {
        return Err(LotteryError::InvalidInput(
            "activity is required".to_string(),
        ));
    }

    let outcome = state.verification.send_code(email, activity).await?;
    let response = match outcome {
        SendOutcome::Disabled => SendCodeResponse {
            sent: false,
            expires_in_minutes: None,
        },
        SendOutcome::Sent {
            expires_in_minutes, ..
        } => SendCodeResponse {
            sent: true,
            expires_in_minutes: Some(expires_in_minutes),
        },
    };
    Ok(Json(response))
}

/// `GET /verification/enabled` — Report whether the gate is active.
async fn verification_enabled(State(state): State<AppState>) -> impl IntoResponse {
    Json(VerificationEnabledResponse {
        enabled: state.verification.is_enabled(),
    })
}

/// Verification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verification/send-code", post(send_code))
        .route("/verification/enabled", get(verification_enabled))
}
