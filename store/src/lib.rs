//! Record store and ordering index access for Redoubt.
//!
//! # Architecture
//!
//! The persistent store is a Redis-compatible service reached over its REST
//! protocol: each command is a JSON array POSTed to the service with a
//! bearer token, batches go through the `/pipeline` endpoint. Two structures
//! are kept per deployment:
//!
//! - **Record store** - one hash per stronghold under `stronghold:<id>`,
//!   holding the full field set.
//! - **Ordering index** - a single sorted set under `strongholds:ready`
//!   mapping each identifier to its ready time in epoch milliseconds, so
//!   listings come back soonest-ready first without scanning every record.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Connection configuration from env and an optional config file |
//! | [`fields`] | Hash field codec for [`Stronghold`] records |
//! | [`redis`] | REST client issuing the Redis commands |
//! | [`retry`] | Bounded transport retry with exponential backoff |
//!
//! # Error Handling
//!
//! Every failure surfaces as a [`StoreError`]; a transient service failure
//! is never collapsed into "not found". Absence is expressed structurally
//! (`Option`, `bool`) by the [`StrongholdStore`] methods.

pub mod config;
pub mod fields;
pub mod redis;
pub mod retry;

pub use config::{ConfigError, StoreConfig};
pub use redis::RedisStore;

use redoubt_types::{Stronghold, StrongholdId};

/// Key prefix for per-stronghold record hashes.
pub const RECORD_KEY_PREFIX: &str = "stronghold:";

/// Well-known key of the ordering index sorted set.
pub const READY_INDEX_KEY: &str = "strongholds:ready";

/// Key of the record hash for `id`.
#[must_use]
pub fn record_key(id: &StrongholdId) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// Failures of the storage dependency.
///
/// None of these variants mean "not found": absence is reported through the
/// return shapes of [`StrongholdStore`], never through an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The service answered with a non-success HTTP status.
    #[error("storage service returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The request never produced a usable response.
    #[error("storage transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service executed the request but the command itself failed
    /// (wrong type, malformed arguments).
    #[error("storage command failed: {0}")]
    Command(String),

    /// A stored record could not be decoded back into a [`Stronghold`].
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// The storage seam the timer engine operates against.
///
/// Implementations must keep failures distinguishable from absence: a
/// transient error is a `StoreError`, a missing record is `Ok(None)` or
/// `Ok(false)`.
#[allow(async_fn_in_trait)]
pub trait StrongholdStore {
    /// Upsert the full record, replacing any prior field set for the same
    /// identifier (stale optional fields do not survive).
    async fn put_record(&self, record: &Stronghold) -> Result<(), StoreError>;

    /// Fetch a record; `Ok(None)` when the identifier is absent.
    async fn get_record(&self, id: &StrongholdId) -> Result<Option<Stronghold>, StoreError>;

    /// Remove a record; `true` if something was actually removed.
    async fn delete_record(&self, id: &StrongholdId) -> Result<bool, StoreError>;

    /// Upsert the ordering index entry for `id` at `score_millis`.
    async fn set_score(&self, id: &StrongholdId, score_millis: i64) -> Result<(), StoreError>;

    /// Remove the ordering index entry; `true` if one existed.
    async fn remove_score(&self, id: &StrongholdId) -> Result<bool, StoreError>;

    /// All indexed identifiers in ascending score order.
    async fn ids_by_score(&self) -> Result<Vec<StrongholdId>, StoreError>;

    /// Batch-fetch records, skipping identifiers with no record (a stale
    /// index entry is not an error on the read path).
    async fn get_records(&self, ids: &[StrongholdId]) -> Result<Vec<Stronghold>, StoreError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_record(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
