//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{ActivitySnapshot, StoredEvent, StoredParticipant};
use crate::config::LotteryConfig;
use crate::error::LotteryError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL with the configured pool limits.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] when the database is
    /// unreachable within the connect timeout.
    pub async fn connect(config: &LotteryConfig) -> Result<Self, LotteryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(Self::new(pool))
    }

    /// Creates the schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn init_schema(&self) -> Result<(), LotteryError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS activity_snapshots (\
                 id BIGSERIAL PRIMARY KEY, \
                 activity TEXT NOT NULL, \
                 state_json JSONB NOT NULL, \
                 snapshot_at TIMESTAMPTZ NOT NULL DEFAULT now())",
            "CREATE INDEX IF NOT EXISTS idx_activity_snapshots_latest \
                 ON activity_snapshots (activity, snapshot_at DESC)",
            "CREATE TABLE IF NOT EXISTS lottery_events (\
                 id BIGSERIAL PRIMARY KEY, \
                 activity TEXT NOT NULL, \
                 event_type TEXT NOT NULL, \
                 payload JSONB NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
            "CREATE INDEX IF NOT EXISTS idx_lottery_events_activity \
                 ON lottery_events (activity, created_at)",
            "CREATE TABLE IF NOT EXISTS participant_records (\
                 token TEXT PRIMARY KEY, \
                 activity TEXT NOT NULL, \
                 record_json JSONB NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
            "CREATE INDEX IF NOT EXISTS idx_participant_records_activity \
                 ON participant_records (activity, created_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| LotteryError::Persistence(e.to_string()))?;
        }
        Ok(())
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn save_event(
        &self,
        activity: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, LotteryError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO lottery_events (activity, event_type, payload) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(activity)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(row)
    }

    /// Saves an activity state snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn save_snapshot(
        &self,
        activity: &str,
        state_json: &serde_json::Value,
    ) -> Result<i64, LotteryError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO activity_snapshots (activity, state_json) \
             VALUES ($1, $2) RETURNING id",
        )
        .bind(activity)
        .bind(state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(row)
    }

    /// Loads the latest snapshot for each activity using `DISTINCT ON`.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn load_latest_snapshots(&self) -> Result<Vec<ActivitySnapshot>, LotteryError> {
        let rows = sqlx::query_as::<_, (i64, String, serde_json::Value, DateTime<Utc>)>(
            "SELECT DISTINCT ON (activity) id, activity, state_json, snapshot_at \
             FROM activity_snapshots ORDER BY activity, snapshot_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, activity, state_json, snapshot_at)| ActivitySnapshot {
                id,
                activity,
                state_json,
                snapshot_at,
            })
            .collect())
    }

    /// Upserts a participation record keyed by token.
    ///
    /// Replaying a token that is already stored is a no-op, so the write
    /// path stays idempotent.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn save_participant(
        &self,
        token: &str,
        activity: &str,
        record_json: &serde_json::Value,
    ) -> Result<(), LotteryError> {
        sqlx::query(
            "INSERT INTO participant_records (token, activity, record_json) \
             VALUES ($1, $2, $3) ON CONFLICT (token) DO NOTHING",
        )
        .bind(token)
        .bind(activity)
        .bind(record_json)
        .execute(&self.pool)
        .await
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(())
    }

    /// Loads every participation record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn load_participants(&self) -> Result<Vec<StoredParticipant>, LotteryError> {
        let rows = sqlx::query_as::<_, (String, String, serde_json::Value, DateTime<Utc>)>(
            "SELECT token, activity, record_json, created_at \
             FROM participant_records ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(token, activity, record_json, created_at)| StoredParticipant {
                token,
                activity,
                record_json,
                created_at,
            })
            .collect())
    }

    /// Loads events after the given timestamp, optionally filtered by
    /// activity.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn load_events_after(
        &self,
        after: DateTime<Utc>,
        activity: Option<&str>,
    ) -> Result<Vec<StoredEvent>, LotteryError> {
        let rows = if let Some(name) = activity {
            sqlx::query_as::<_, (i64, String, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, activity, event_type, payload, created_at FROM lottery_events \
                 WHERE created_at > $1 AND activity = $2 ORDER BY created_at ASC",
            )
            .bind(after)
            .bind(name)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (i64, String, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, activity, event_type, payload, created_at FROM lottery_events \
                 WHERE created_at > $1 ORDER BY created_at ASC",
            )
            .bind(after)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, activity, event_type, payload, created_at)| StoredEvent {
                    id,
                    activity,
                    event_type,
                    payload,
                    created_at,
                },
            )
            .collect())
    }

    /// Deletes snapshots older than the given number of days.
    ///
    /// # Errors
    ///
    /// Returns a [`LotteryError::Persistence`] on database failure.
    pub async fn delete_old_snapshots(&self, before_days: u64) -> Result<u64, LotteryError> {
        let cutoff =
            Utc::now() - chrono::Duration::days(i64::try_from(before_days).unwrap_or(i64::MAX));

        let result = sqlx::query("DELETE FROM activity_snapshots WHERE snapshot_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| LotteryError::Persistence(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
