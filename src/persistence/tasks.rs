//! Background persistence tasks: boot-time restore, periodic
//! snapshots, event logging, and snapshot cleanup.
//!
//! Every loop is fail-soft: a database hiccup is logged and the next
//! tick retries, so persistence trouble never takes the gateway down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::postgres::PostgresPersistence;
use crate::domain::{Activity, EventBus, LotteryEvent, LotteryStore, Participant};
use crate::error::LotteryError;

/// Restores activities and participation records from the database
/// into an empty store. Returns `(activities, participants)` counts.
///
/// Rows that no longer deserialize are skipped with a warning rather
/// than failing the boot.
///
/// # Errors
///
/// Returns a [`LotteryError::Persistence`] when the restore queries
/// themselves fail.
pub async fn restore_store(
    store: &LotteryStore,
    persistence: &PostgresPersistence,
) -> Result<(usize, usize), LotteryError> {
    let mut activities = 0_usize;
    for snapshot in persistence.load_latest_snapshots().await? {
        match serde_json::from_value::<Activity>(snapshot.state_json) {
            Ok(activity) => {
                if let Err(error) = store.insert_activity(activity).await {
                    tracing::warn!(activity = %snapshot.activity, %error, "skipping snapshot restore");
                } else {
                    activities = activities.saturating_add(1);
                }
            }
            Err(error) => {
                tracing::warn!(activity = %snapshot.activity, %error, "undecodable activity snapshot");
            }
        }
    }

    let mut participants = 0_usize;
    for record in persistence.load_participants().await? {
        match serde_json::from_value::<Participant>(record.record_json) {
            Ok(participant) => {
                store.restore_participant(participant).await;
                participants = participants.saturating_add(1);
            }
            Err(error) => {
                tracing::warn!(token = %record.token, %error, "undecodable participation record");
            }
        }
    }

    Ok((activities, participants))
}

/// Periodically snapshots every activity into `activity_snapshots`.
pub async fn run_snapshot_loop(
    store: Arc<LotteryStore>,
    persistence: PostgresPersistence,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        for activity in store.snapshot_activities().await {
            let state_json = serde_json::to_value(&activity).unwrap_or_default();
            if let Err(error) = persistence.save_snapshot(&activity.name, &state_json).await {
                tracing::warn!(activity = %activity.name, %error, "snapshot write failed");
            }
        }
    }
}

/// Appends every bus event to the `lottery_events` log, and mirrors
/// participation commits into `participant_records`.
pub async fn run_event_log_loop(
    store: Arc<LotteryStore>,
    event_bus: EventBus,
    persistence: PostgresPersistence,
) {
    let mut rx = event_bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = serde_json::to_value(&event).unwrap_or_default();
                if let Err(error) = persistence
                    .save_event(event.activity(), event.event_type_str(), &payload)
                    .await
                {
                    tracing::warn!(%error, "event log write failed");
                }

                if let LotteryEvent::ParticipantJoined { token, .. } = &event
                    && let Some(participant) = store.find_by_token(token).await
                {
                    let record_json = serde_json::to_value(&participant).unwrap_or_default();
                    if let Err(error) = persistence
                        .save_participant(token, &participant.activity, &record_json)
                        .await
                    {
                        tracing::warn!(token = %token, %error, "participant record write failed");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "event log task lagged behind event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Deletes snapshots older than `after_days` once a day. A zero value
/// disables cleanup entirely.
pub async fn run_cleanup_loop(persistence: PostgresPersistence, after_days: u64) {
    if after_days == 0 {
        return;
    }
    let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
    loop {
        interval.tick().await;
        match persistence.delete_old_snapshots(after_days).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, "old activity snapshots removed");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "snapshot cleanup failed");
            }
        }
    }
}
