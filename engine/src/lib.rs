//! Timer engine for stronghold reset tracking.
//!
//! # Architecture
//!
//! The engine is the logic layer between callers and the storage dependency.
//! It owns every rule with correctness weight: ready-time arithmetic,
//! composite identity, and consistency between the record store and the
//! ordering index.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`TimerEngine::create`] | Upsert record by derived identity, index at `ready_at` |
//! | [`TimerEngine::delete`] | Remove index entry and record, true if either existed |
//! | [`TimerEngine::list`] | Index-ordered read of all records, soonest ready first |
//! | [`TimerEngine::reset_timer`] | Re-baseline with the fixed 1d 12h reset interval |
//! | [`TimerEngine::edit_duration`] | Re-baseline from now with a caller-supplied duration |
//! | [`TimerEngine::edit_metadata`] | Level (write-once) and alliance updates, no timer effect |
//!
//! # Consistency
//!
//! Every mutation that changes `ready_at` writes the record first and then
//! the index score, using the exact millisecond value persisted in the
//! record. There is no transaction across the two writes: a crash in
//! between leaves a stale score until the entity is next mutated. The index
//! is only an ordering accelerator, so [`TimerEngine::list`] re-sorts by
//! each record's own `ready_at` and tolerates index entries with no record.
//!
//! # Failure policy
//!
//! Validation failures are rejected before any storage access. Missing
//! targets are `Ok(false)`, not errors. Storage failures propagate on the
//! write path and degrade to an empty listing on the read path; the engine
//! performs no retries of its own.

mod clock;

pub use clock::{Clock, SystemClock};

use chrono::{DateTime, Days, TimeDelta, Utc};
use redoubt_store::{StoreError, StrongholdStore};
use redoubt_types::{Level, NewStronghold, ResetDuration, Stronghold, StrongholdId, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The timer engine, generic over its storage seam and time source.
#[derive(Debug, Clone)]
pub struct TimerEngine<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: StrongholdStore> TimerEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: StrongholdStore, C: Clock> TimerEngine<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Create (or overwrite) the stronghold identified by the input's
    /// warzone and coordinates.
    ///
    /// Re-creating an existing triple is a deliberate upsert: the prior
    /// record and its score are replaced wholesale.
    pub async fn create(&self, input: NewStronghold) -> Result<Stronghold, EngineError> {
        let created_at = self.now();
        let ready_at = ready_time(created_at, input.duration)?;
        let record = Stronghold {
            id: input.id(),
            warzone: input.warzone,
            coordinate_x: input.coordinate_x,
            coordinate_y: input.coordinate_y,
            duration: input.duration,
            created_at,
            ready_at,
            level: input.level,
            alliance_name: input.alliance_name,
        };

        self.store.put_record(&record).await?;
        self.store
            .set_score(&record.id, record.ready_at_epoch_millis())
            .await?;

        tracing::info!(id = %record.id, ready_at = %record.ready_at, "Stronghold created");
        Ok(record)
    }

    /// Remove the stronghold from both structures.
    ///
    /// Returns `true` if either removal actually removed something, so an
    /// entity left half-deleted by an earlier crash is still deletable.
    pub async fn delete(&self, id: &StrongholdId) -> Result<bool, EngineError> {
        let removed_score = self.store.remove_score(id).await?;
        let removed_record = self.store.delete_record(id).await?;
        let removed = removed_score || removed_record;
        if removed {
            tracing::info!(%id, "Stronghold deleted");
        }
        Ok(removed)
    }

    /// All strongholds, soonest ready first.
    ///
    /// Read-soft-fail: a storage failure is logged and rendered as an empty
    /// listing rather than propagated, so a flaky read never blocks display.
    pub async fn list(&self) -> Vec<Stronghold> {
        match self.try_list().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Listing strongholds failed");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<Stronghold>, StoreError> {
        let ids = self.store.ids_by_score().await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut records = self.store.get_records(&ids).await?;
        // The index score can lag a crashed write; the record's own
        // ready_at is authoritative.
        records.sort_by(|a, b| a.ready_at.cmp(&b.ready_at));
        Ok(records)
    }

    /// Restart the countdown with the fixed reset interval (1 day 12 hours).
    pub async fn reset_timer(&self, id: &StrongholdId) -> Result<bool, EngineError> {
        self.edit_duration(id, ResetDuration::RESET).await
    }

    /// Replace the duration and re-baseline the countdown from this moment.
    ///
    /// The original creation time is deliberately discarded: the duration a
    /// caller enters is the time remaining from now, not from whenever the
    /// record was first created. Returns `false` if the record is missing.
    pub async fn edit_duration(
        &self,
        id: &StrongholdId,
        duration: ResetDuration,
    ) -> Result<bool, EngineError> {
        let Some(mut record) = self.store.get_record(id).await? else {
            return Ok(false);
        };

        record.duration = duration;
        record.created_at = self.now();
        record.ready_at = ready_time(record.created_at, duration)?;

        self.store.put_record(&record).await?;
        self.store
            .set_score(id, record.ready_at_epoch_millis())
            .await?;

        tracing::info!(%id, ready_at = %record.ready_at, "Stronghold duration updated");
        Ok(true)
    }

    /// Update domain metadata without touching the timer or the index.
    ///
    /// `level` is write-once: when the record already carries one, the
    /// supplied value is silently ignored. `alliance_name` is always
    /// overwritten, including being cleared when `None`. Returns `false` if
    /// the record is missing.
    pub async fn edit_metadata(
        &self,
        id: &StrongholdId,
        alliance_name: Option<String>,
        level: Option<Level>,
    ) -> Result<bool, EngineError> {
        let Some(mut record) = self.store.get_record(id).await? else {
            return Ok(false);
        };

        if record.level.is_none() {
            record.level = level;
        }
        record.alliance_name = alliance_name;

        self.store.put_record(&record).await?;
        Ok(true)
    }

    fn now(&self) -> DateTime<Utc> {
        clock::to_millis(self.clock.now())
    }
}

/// Ready time for a countdown starting at `baseline`.
///
/// Days are added as calendar days, the rest as a plain offset, so the
/// result follows the date arithmetic of the underlying calendar.
fn ready_time(
    baseline: DateTime<Utc>,
    duration: ResetDuration,
) -> Result<DateTime<Utc>, ValidationError> {
    let seconds = i64::from(duration.hours) * 3600
        + i64::from(duration.minutes) * 60
        + i64::from(duration.seconds);
    baseline
        .checked_add_days(Days::new(u64::from(duration.days)))
        .and_then(|t| t.checked_add_signed(TimeDelta::seconds(seconds)))
        .ok_or(ValidationError::DurationOverflow)
}

#[cfg(test)]
mod tests;
