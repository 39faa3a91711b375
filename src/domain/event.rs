//! Domain events reflecting activity state mutations.
//!
//! Every successful mutation emits a [`LotteryEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers and
//! optionally persisted to the PostgreSQL event log. Verification codes
//! never appear here: the event stream is public.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::activity::{ActivityState, LotteryMode, ParticipationRule, Winner};

/// Domain event emitted after every activity mutation.
///
/// Participant-facing fields carry the participation token rather than
/// the raw identity, except for winner announcements where the winner
/// identifier is deliberately public.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LotteryEvent {
    /// Emitted when a new activity is created.
    ActivityCreated {
        /// Activity name.
        activity: String,
        /// Prize allocation mode.
        mode: LotteryMode,
        /// Admission rule.
        rule: ParticipationRule,
        /// Participation window end, if the activity has one.
        end_time: Option<DateTime<Utc>>,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a state derivation wrote back a new lifecycle state.
    StateChanged {
        /// Activity name.
        activity: String,
        /// State before the transition.
        from: ActivityState,
        /// State after the transition.
        to: ActivityState,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a participation was recorded.
    ParticipantJoined {
        /// Activity name.
        activity: String,
        /// Participation token of the new record.
        token: String,
        /// Participant count after the commit.
        participant_count: u32,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an instant draw awarded a prize at participation time.
    PrizeAwarded {
        /// Activity name.
        activity: String,
        /// Winner identity (username or email).
        identifier: String,
        /// Prize that was awarded.
        prize_name: String,
        /// Award timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted once when a batch draw completed.
    ActivityDrawn {
        /// Activity name.
        activity: String,
        /// Full winner list, in award order.
        winners: Vec<Winner>,
        /// Draw timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl LotteryEvent {
    /// Returns the activity name this event belongs to.
    #[must_use]
    pub fn activity(&self) -> &str {
        match self {
            Self::ActivityCreated { activity, .. }
            | Self::StateChanged { activity, .. }
            | Self::ParticipantJoined { activity, .. }
            | Self::PrizeAwarded { activity, .. }
            | Self::ActivityDrawn { activity, .. } => activity,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ActivityCreated { .. } => "activity_created",
            Self::StateChanged { .. } => "state_changed",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::PrizeAwarded { .. } => "prize_awarded",
            Self::ActivityDrawn { .. } => "activity_drawn",
        }
    }
}
