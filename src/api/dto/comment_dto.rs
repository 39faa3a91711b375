//! Comment directory DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /comments`.
///
/// Exactly one of `email` and `username` identifies the author.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentIngestRequest {
    /// Upstream comment id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// Post or page the comment was made on.
    pub post: String,
    /// Author email, for comments by anonymous visitors.
    #[serde(default)]
    pub email: Option<String>,
    /// Author username, for comments by logged-in accounts.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name shown with the comment.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response body for `POST /comments`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentIngestResponse {
    /// Id of the stored comment.
    pub id: String,
}

/// Query parameters for `GET /comments/check`.
#[derive(Debug, Deserialize)]
pub struct CommentCheckParams {
    /// Post to check for a comment.
    pub post: String,
    /// Email to match when the caller is anonymous.
    #[serde(default)]
    pub email: Option<String>,
}

/// Response body for `GET /comments/check`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentCheckResponse {
    /// Whether a matching comment exists on the post.
    pub has_commented: bool,
    /// Whether the check ran against an authenticated identity.
    pub logged_in: bool,
}
