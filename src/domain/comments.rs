//! In-memory comment directory backing comment-gated admission.
//!
//! The gateway does not host a comment system; it keeps a mirror of
//! comments pushed in through the ingest endpoint and answers one
//! question: has this identity commented on this content?

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Identity that authored a comment.
///
/// Anonymous commenters are identified by email, authenticated ones by
/// username. A single comment carries exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAuthor {
    /// Anonymous commenter, identified by email address.
    Email(String),
    /// Authenticated commenter, identified by username.
    User(String),
}

/// One mirrored comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    /// Stable reference to the comment in the source system.
    pub id: String,
    /// Content the comment was left on.
    pub post: String,
    /// Authoring identity.
    pub author: CommentAuthor,
    /// Display name the commenter used, if any.
    pub display_name: Option<String>,
    /// When the comment was mirrored.
    pub created_at: DateTime<Utc>,
}

/// Append-only directory of mirrored comments.
#[derive(Debug, Default)]
pub struct CommentDirectory {
    comments: RwLock<Vec<CommentRecord>>,
}

impl CommentDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mirrored comment.
    pub async fn ingest(&self, record: CommentRecord) {
        self.comments.write().await.push(record);
    }

    /// Finds the first comment on `post` authored by `email`.
    ///
    /// Email comparison is case-insensitive, matching how anonymous
    /// commenters re-enter their address by hand.
    pub async fn find_by_email(&self, post: &str, email: &str) -> Option<CommentRecord> {
        let comments = self.comments.read().await;
        comments
            .iter()
            .find(|c| {
                c.post == post
                    && matches!(&c.author, CommentAuthor::Email(e) if e.eq_ignore_ascii_case(email))
            })
            .cloned()
    }

    /// Finds the first comment on `post` authored by the exact `username`.
    pub async fn find_by_username(&self, post: &str, username: &str) -> Option<CommentRecord> {
        let comments = self.comments.read().await;
        comments
            .iter()
            .find(|c| {
                c.post == post && matches!(&c.author, CommentAuthor::User(u) if u == username)
            })
            .cloned()
    }

    /// Returns the number of mirrored comments.
    pub async fn len(&self) -> usize {
        self.comments.read().await.len()
    }

    /// Returns `true` when no comments have been mirrored.
    pub async fn is_empty(&self) -> bool {
        self.comments.read().await.is_empty()
    }
}
