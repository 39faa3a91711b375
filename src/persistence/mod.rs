//! Persistence layer: PostgreSQL event log, activity snapshots, and
//! participation records.
//!
//! The gateway keeps all live state in memory; PostgreSQL is a durable
//! shadow used to restore the store on boot. The concrete
//! implementation uses `sqlx::PgPool` for async PostgreSQL access, and
//! the whole layer is optional: when the database is unreachable the
//! gateway runs memory-only.

pub mod models;
pub mod postgres;
pub mod tasks;
