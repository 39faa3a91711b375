//! Database models for events, snapshots, and participant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored event row from the `lottery_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Activity that generated the event.
    pub activity: String,
    /// Event type discriminator (e.g. `"participant_joined"`).
    pub event_type: String,
    /// JSONB payload with event-specific data.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An activity snapshot row from the `activity_snapshots` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    /// Auto-increment row ID.
    pub id: i64,
    /// Activity that was snapshotted.
    pub activity: String,
    /// Full activity state as JSONB.
    pub state_json: serde_json::Value,
    /// Snapshot timestamp.
    pub snapshot_at: DateTime<Utc>,
}

/// A participation record row from the `participant_records` table.
///
/// The token is the primary key, so replaying the same participation
/// on reconnect is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredParticipant {
    /// Participation token (primary key).
    pub token: String,
    /// Activity the record belongs to.
    pub activity: String,
    /// Full participation record as JSONB.
    pub record_json: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
