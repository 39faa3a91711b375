//! Domain layer: activity model, draws, storage, and the event system.
//!
//! This module contains the server-side domain model: the activity with
//! its time-derived state machine, participation records and tokens, the
//! weighted draw engine, the comment directory for gated admission, the
//! concurrent store, and the event bus broadcasting state changes.

pub mod activity;
pub mod comments;
pub mod draw;
pub mod event;
pub mod event_bus;
pub mod participant;
pub mod store;
pub mod token;

pub use activity::{
    Activity, ActivityFilter, ActivitySpec, ActivityState, ActivityStatus, ActivitySummary,
    LotteryMode, ParticipationRule, Prize, Winner, DEFAULT_THANK_YOU_SLOTS,
};
pub use comments::{CommentAuthor, CommentDirectory, CommentRecord};
pub use event::LotteryEvent;
pub use event_bus::EventBus;
pub use participant::{Participant, ParticipantId, Principal};
pub use store::LotteryStore;
