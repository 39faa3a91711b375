//! Concurrent in-memory store for activities and participation records.
//!
//! [`LotteryStore`] keeps activities in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::RwLock`], and participation
//! records in one append-only table behind its own lock.
//!
//! # Lock order
//!
//! Tasks that need more than one lock must acquire them in this order:
//! activities map, then an activity entry, then the participants table.
//! Participation commits hold an activity entry write lock while they
//! scan and append participant records, which is what makes the
//! duplicate check and the insert one atomic step.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard};

use super::activity::Activity;
use super::participant::{Participant, Principal};
use crate::error::LotteryError;

/// Central store for all activities and participation records.
#[derive(Debug, Default)]
pub struct LotteryStore {
    activities: RwLock<HashMap<String, Arc<RwLock<Activity>>>>,
    participants: RwLock<Vec<Participant>>,
}

impl LotteryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new activity under its unique name.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidInput`] if an activity with the same
    /// name already exists.
    pub async fn insert_activity(&self, activity: Activity) -> Result<(), LotteryError> {
        let mut map = self.activities.write().await;
        if map.contains_key(&activity.name) {
            return Err(LotteryError::InvalidInput(format!(
                "activity {} already exists",
                activity.name
            )));
        }
        map.insert(activity.name.clone(), Arc::new(RwLock::new(activity)));
        Ok(())
    }

    /// Returns the shared handle to an activity entry.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::NotFound`] if no activity with the given
    /// name exists.
    pub async fn activity(&self, name: &str) -> Result<Arc<RwLock<Activity>>, LotteryError> {
        let map = self.activities.read().await;
        map.get(name)
            .cloned()
            .ok_or_else(|| LotteryError::NotFound(format!("activity {name}")))
    }

    /// Returns handles to every activity entry.
    pub async fn activity_entries(&self) -> Vec<Arc<RwLock<Activity>>> {
        let map = self.activities.read().await;
        map.values().cloned().collect()
    }

    /// Clones the current state of every activity (read locks only).
    ///
    /// Used by the snapshot task; per-entry locking means the result is a
    /// point-in-time view per activity, not a global one.
    pub async fn snapshot_activities(&self) -> Vec<Activity> {
        let entries = self.activity_entries().await;
        let mut snapshot = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshot.push(entry.read().await.clone());
        }
        snapshot
    }

    /// Acquires the participants table for writing.
    ///
    /// Participation commits call this while already holding the target
    /// activity's write lock (see the lock order above) so the duplicate
    /// scan and the append happen under one critical section.
    pub async fn participants_write(&self) -> RwLockWriteGuard<'_, Vec<Participant>> {
        self.participants.write().await
    }

    /// Appends a participation record without duplicate checking.
    ///
    /// Only used when restoring records from persistence at boot, where
    /// the data already went through admission once.
    pub async fn restore_participant(&self, participant: Participant) {
        self.participants.write().await.push(participant);
    }

    /// Finds the first participation record carrying `token`.
    pub async fn find_by_token(&self, token: &str) -> Option<Participant> {
        let table = self.participants.read().await;
        table.iter().find(|p| p.token == token).cloned()
    }

    /// Returns all participation records for an activity, in insertion order.
    pub async fn list_for_activity(&self, activity: &str) -> Vec<Participant> {
        let table = self.participants.read().await;
        table
            .iter()
            .filter(|p| p.activity == activity)
            .cloned()
            .collect()
    }

    /// Returns all participation records owned by a principal, across
    /// activities, in insertion order.
    pub async fn list_owned_by(&self, principal: &Principal) -> Vec<Participant> {
        let table = self.participants.read().await;
        table
            .iter()
            .filter(|p| p.is_owned_by(principal))
            .cloned()
            .collect()
    }

    /// Returns the number of stored activities.
    pub async fn len(&self) -> usize {
        self.activities.read().await.len()
    }

    /// Returns `true` if the store holds no activities.
    pub async fn is_empty(&self) -> bool {
        self.activities.read().await.is_empty()
    }
}
