//! Participation DTOs: join requests, results, status, recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Participant, ParticipantId};
use crate::service::ParticipationStatus;

/// Request body shared by the participate endpoints.
///
/// Anonymous and comment-by-email paths require `email`; logged-in
/// paths ignore it and use the proxy identity headers instead.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ParticipateRequest {
    /// Email identity for the anonymous and email-comment paths.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name to record alongside the participation.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Target post override for comment-gated paths.
    #[serde(default)]
    pub post: Option<String>,
    /// Verification code for email-identified paths.
    #[serde(default)]
    pub verification_code: Option<String>,
}

/// Response body for successful participation and token recovery.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipationResponse {
    /// Activity name.
    pub activity: String,
    /// Participation token for later status lookups.
    pub token: String,
    /// Whether an instant draw awarded a prize.
    pub is_winner: bool,
    /// The awarded prize, when `is_winner` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
    /// Commit timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<Participant> for ParticipationResponse {
    fn from(record: Participant) -> Self {
        Self {
            activity: record.activity,
            token: record.token,
            is_winner: record.is_winner,
            prize_name: record.prize_name,
            joined_at: record.joined_at,
        }
    }
}

/// Query parameters for `GET /activities/{name}/status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    /// Participation token to look up. A blank token reports no
    /// participation.
    #[serde(default)]
    pub token: String,
}

/// Response body for `GET /activities/{name}/status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Whether a record exists for the token.
    pub participated: bool,
    /// The token echoed back when a record was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Whether the record won, instantly or in the batch draw.
    pub is_winner: bool,
    /// Prize name when `is_winner` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
}

impl From<ParticipationStatus> for StatusResponse {
    fn from(status: ParticipationStatus) -> Self {
        Self {
            participated: status.participated,
            token: status.token,
            is_winner: status.is_winner,
            prize_name: status.prize_name,
        }
    }
}

/// Request body for `POST /activities/{name}/recover`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecoverRequest {
    /// Email the participation was registered under.
    pub email: String,
}

/// A full participation record, used by admin and account listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantRecordDto {
    /// Record identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: ParticipantId,
    /// Activity the record belongs to.
    pub activity: String,
    /// Email identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Username identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Display name shown in winner lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Participation token.
    pub token: String,
    /// Commit timestamp.
    pub joined_at: DateTime<Utc>,
    /// Best-effort client address at commit time.
    pub ip: String,
    /// Whether an instant draw awarded a prize.
    pub is_winner: bool,
    /// The awarded prize, when `is_winner` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
    /// When the instant draw awarded the prize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub won_at: Option<DateTime<Utc>>,
    /// Matched comment id on comment-gated paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_ref: Option<String>,
}

impl From<Participant> for ParticipantRecordDto {
    fn from(record: Participant) -> Self {
        Self {
            id: record.id,
            activity: record.activity,
            email: record.email,
            username: record.username,
            display_name: record.display_name,
            token: record.token,
            joined_at: record.joined_at,
            ip: record.ip,
            is_winner: record.is_winner,
            prize_name: record.prize_name,
            won_at: record.won_at,
            comment_ref: record.comment_ref,
        }
    }
}

/// Response body for `GET /activities/{name}/participants`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantListResponse {
    /// Page of participation records.
    pub data: Vec<ParticipantRecordDto>,
    /// Pagination metadata.
    pub pagination: super::PaginationMeta,
}

/// Request body for `POST /verification/send-code`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendCodeRequest {
    /// Email to issue the code for.
    pub email: String,
    /// Activity the code is scoped to.
    pub activity: String,
}

/// Response body for `POST /verification/send-code`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendCodeResponse {
    /// Whether a code was issued. `false` means verification is
    /// disabled and no code is needed.
    pub sent: bool,
    /// Minutes until the issued code expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<i64>,
}

/// Response body for `GET /verification/enabled`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationEnabledResponse {
    /// Whether email-identified paths require a verification code.
    pub enabled: bool,
}
