//! Per-connection subscription manager.
//!
//! Tracks which activities a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

/// Manages the set of activity subscriptions for a single WebSocket
/// connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed activity names. If `subscribe_all` is true, this set is ignored.
    activities: HashSet<String>,
    /// Whether the client subscribes to all activities (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds activity names to the subscription set. `wildcard` enables
    /// the match-all filter.
    pub fn subscribe(&mut self, names: &[String], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        for name in names {
            self.activities.insert(name.clone());
        }
    }

    /// Removes activity names from the subscription set.
    pub fn unsubscribe(&mut self, names: &[String]) {
        for name in names {
            self.activities.remove(name);
        }
    }

    /// Returns `true` if the given activity matches the subscription filter.
    #[must_use]
    pub fn matches(&self, activity: &str) -> bool {
        self.subscribe_all || self.activities.contains(activity)
    }

    /// Returns the number of explicitly subscribed activities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.activities.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
