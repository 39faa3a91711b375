//! Participation records and caller identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a participation record (UUID v4).
///
/// Newtype wrapper so participation ids cannot be confused with other
/// UUIDs in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(uuid::Uuid);

impl ParticipantId {
    /// Creates a new random `ParticipantId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ParticipantId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated caller identity, resolved from trusted reverse-proxy
/// headers. Absent on anonymous requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable account username.
    pub username: String,
    /// Account email, if the identity provider supplied one.
    pub email: Option<String>,
    /// Display name, if supplied.
    pub display_name: Option<String>,
}

/// One successful participation in an activity.
///
/// Append-only: records are never mutated after the commit that created
/// them. `is_winner` and `prize_name` are set at creation time by instant
/// draws; batch draw results live on the activity's winner list instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Record identifier.
    pub id: ParticipantId,
    /// Name of the activity participated in.
    pub activity: String,
    /// Email identity, when the path supplied one.
    pub email: Option<String>,
    /// Username identity, on authenticated paths.
    pub username: Option<String>,
    /// Display name for UI purposes.
    pub display_name: Option<String>,
    /// Deterministic participation token (see [`crate::domain::token`]).
    pub token: String,
    /// When the participation was recorded.
    pub joined_at: DateTime<Utc>,
    /// Client IP as reported by the reverse proxy. Empty when unknown.
    pub ip: String,
    /// Whether an instant draw awarded a prize at participation time.
    pub is_winner: bool,
    /// Prize awarded by the instant draw, if any.
    pub prize_name: Option<String>,
    /// When the instant draw awarded the prize.
    pub won_at: Option<DateTime<Utc>>,
    /// Reference to the comment that satisfied a comment-gated rule.
    pub comment_ref: Option<String>,
}

impl Participant {
    /// Canonical identity string: username when present, email otherwise.
    ///
    /// This is the value batch draws record on the winner list, so status
    /// lookups can correlate a participation record with a batch win.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_default()
    }

    /// Whether this record belongs to the given principal.
    ///
    /// Matches on exact username or case-insensitive email, mirroring how
    /// identities are recorded across the different participation paths.
    #[must_use]
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        if self.username.as_deref() == Some(principal.username.as_str()) {
            return true;
        }
        match (self.email.as_deref(), principal.email.as_deref()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}
