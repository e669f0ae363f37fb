//! Engine behavior tests against an in-memory store and a pinned clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, TimeDelta, TimeZone, Utc};
use redoubt_store::{StoreError, StrongholdStore};
use redoubt_types::{Level, NewStronghold, ResetDuration, Stronghold, StrongholdId};

use crate::{Clock, EngineError, TimerEngine};

#[derive(Default)]
struct Inner {
    records: HashMap<String, Stronghold>,
    index: HashMap<String, i64>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory store double with injectable failures.
#[derive(Clone, Default)]
struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    fn score_of(&self, id: &StrongholdId) -> Option<i64> {
        self.inner.lock().unwrap().index.get(id.as_str()).copied()
    }

    fn set_raw_score(&self, id: &StrongholdId, score: i64) {
        self.inner
            .lock()
            .unwrap()
            .index
            .insert(id.to_string(), score);
    }

    fn drop_record_keep_index(&self, id: &StrongholdId) {
        self.inner.lock().unwrap().records.remove(id.as_str());
    }

    fn fail_reads(&self) {
        self.inner.lock().unwrap().fail_reads = true;
    }

    fn fail_writes(&self) {
        self.inner.lock().unwrap().fail_writes = true;
    }
}

fn injected(kind: &str) -> StoreError {
    StoreError::Command(format!("injected {kind} failure"))
}

impl StrongholdStore for MemoryStore {
    async fn put_record(&self, record: &Stronghold) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(injected("write"));
        }
        inner.records.insert(record.id.to_string(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &StrongholdId) -> Result<Option<Stronghold>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(injected("read"));
        }
        Ok(inner.records.get(id.as_str()).cloned())
    }

    async fn delete_record(&self, id: &StrongholdId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(injected("write"));
        }
        Ok(inner.records.remove(id.as_str()).is_some())
    }

    async fn set_score(&self, id: &StrongholdId, score_millis: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(injected("write"));
        }
        inner.index.insert(id.to_string(), score_millis);
        Ok(())
    }

    async fn remove_score(&self, id: &StrongholdId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(injected("write"));
        }
        Ok(inner.index.remove(id.as_str()).is_some())
    }

    async fn ids_by_score(&self) -> Result<Vec<StrongholdId>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(injected("read"));
        }
        let mut entries: Vec<(i64, &String)> =
            inner.index.iter().map(|(id, score)| (*score, id)).collect();
        entries.sort();
        Ok(entries
            .into_iter()
            .map(|(_, id)| StrongholdId::from_raw(id.clone()))
            .collect())
    }
}

#[derive(Clone)]
struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn test_engine() -> (TimerEngine<MemoryStore, FixedClock>, MemoryStore, FixedClock) {
    let store = MemoryStore::default();
    let clock = FixedClock::at(t0());
    let engine = TimerEngine::with_clock(store.clone(), clock.clone());
    (engine, store, clock)
}

fn input(warzone: i32, x: i32, y: i32, duration: ResetDuration) -> NewStronghold {
    NewStronghold::new(warzone, x, y, duration)
}

#[tokio::test]
async fn create_computes_ready_time_from_duration() {
    let (engine, _, _) = test_engine();

    let record = engine
        .create(input(12, 448, 512, ResetDuration::new(1, 2, 3, 4)))
        .await
        .unwrap();

    assert_eq!(record.id.as_str(), "12:448:512");
    assert_eq!(record.created_at, t0());
    assert_eq!(
        record.ready_at,
        t0() + Days::new(1) + TimeDelta::seconds(2 * 3600 + 3 * 60 + 4)
    );
}

#[tokio::test]
async fn zero_duration_is_immediately_ready() {
    let (engine, _, _) = test_engine();

    let record = engine
        .create(input(1, 2, 3, ResetDuration::default()))
        .await
        .unwrap();

    assert_eq!(record.ready_at, record.created_at);
    assert!(record.is_ready(t0()));
}

#[tokio::test]
async fn overflowing_duration_is_rejected_before_storage() {
    let (engine, store, _) = test_engine();

    let result = engine
        .create(input(1, 2, 3, ResetDuration::new(u32::MAX, 0, 0, 0)))
        .await;

    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert_eq!(store.score_of(&StrongholdId::from_parts(1, 2, 3)), None);
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn create_indexes_exact_ready_millis() {
    let (engine, store, _) = test_engine();

    let record = engine
        .create(input(1, 2, 3, ResetDuration::new(0, 0, 5, 0)))
        .await
        .unwrap();

    assert_eq!(
        store.score_of(&record.id),
        Some(record.ready_at_epoch_millis())
    );
}

#[tokio::test]
async fn recreating_same_triple_overwrites() {
    let (engine, _, clock) = test_engine();

    engine
        .create(input(5, 5, 5, ResetDuration::new(3, 0, 0, 0)))
        .await
        .unwrap();
    clock.advance(TimeDelta::hours(2));
    let second = engine
        .create(input(5, 5, 5, ResetDuration::new(0, 1, 0, 0)))
        .await
        .unwrap();

    let listed = engine.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], second);
    assert_eq!(listed[0].created_at, t0() + TimeDelta::hours(2));
}

#[tokio::test]
async fn list_orders_soonest_ready_first() {
    let (engine, _, _) = test_engine();

    // Created out of ready order on purpose.
    engine
        .create(input(1, 0, 0, ResetDuration::new(0, 0, 0, 10)))
        .await
        .unwrap();
    engine
        .create(input(2, 0, 0, ResetDuration::new(0, 0, 0, 5)))
        .await
        .unwrap();
    engine
        .create(input(3, 0, 0, ResetDuration::new(0, 0, 0, 1)))
        .await
        .unwrap();

    let listed = engine.list().await;
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["3:0:0", "2:0:0", "1:0:0"]);
}

#[tokio::test]
async fn list_is_empty_for_empty_index() {
    let (engine, _, _) = test_engine();
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn list_soft_fails_to_empty_on_storage_error() {
    let (engine, store, _) = test_engine();
    engine
        .create(input(1, 2, 3, ResetDuration::RESET))
        .await
        .unwrap();
    store.fail_reads();

    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn list_resorts_past_a_stale_index_score() {
    let (engine, store, _) = test_engine();

    let early = engine
        .create(input(1, 0, 0, ResetDuration::new(0, 0, 1, 0)))
        .await
        .unwrap();
    let late = engine
        .create(input(2, 0, 0, ResetDuration::new(0, 2, 0, 0)))
        .await
        .unwrap();

    // Simulate a crash that left the early entity's score pointing far out.
    store.set_raw_score(&early.id, late.ready_at_epoch_millis() + 60_000);

    let listed = engine.list().await;
    assert_eq!(listed[0].id, early.id);
    assert_eq!(listed[1].id, late.id);
}

#[tokio::test]
async fn list_skips_index_entries_without_records() {
    let (engine, store, _) = test_engine();

    let ghost = engine
        .create(input(9, 9, 9, ResetDuration::new(0, 1, 0, 0)))
        .await
        .unwrap();
    engine
        .create(input(1, 1, 1, ResetDuration::new(0, 2, 0, 0)))
        .await
        .unwrap();
    store.drop_record_keep_index(&ghost.id);

    let listed = engine.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_str(), "1:1:1");
}

#[tokio::test]
async fn delete_missing_returns_false() {
    let (engine, _, _) = test_engine();
    let deleted = engine
        .delete(&StrongholdId::from_raw("404:0:0"))
        .await
        .unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn delete_removes_from_listing() {
    let (engine, _, _) = test_engine();
    let record = engine
        .create(input(1, 2, 3, ResetDuration::RESET))
        .await
        .unwrap();

    assert!(engine.delete(&record.id).await.unwrap());
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn delete_succeeds_on_half_deleted_state() {
    let (engine, store, _) = test_engine();
    let record = engine
        .create(input(1, 2, 3, ResetDuration::RESET))
        .await
        .unwrap();
    store.drop_record_keep_index(&record.id);

    // Only the index entry is left; delete must still report success.
    assert!(engine.delete(&record.id).await.unwrap());
    assert_eq!(store.score_of(&record.id), None);
}

#[tokio::test]
async fn edit_duration_rebaselines_from_now() {
    let (engine, store, clock) = test_engine();
    let record = engine
        .create(input(7, 7, 7, ResetDuration::new(10, 0, 0, 0)))
        .await
        .unwrap();

    clock.advance(TimeDelta::days(5));
    let now = t0() + TimeDelta::days(5);

    assert!(engine
        .edit_duration(&record.id, ResetDuration::new(1, 0, 0, 0))
        .await
        .unwrap());

    let updated = engine.list().await.pop().unwrap();
    assert_eq!(updated.created_at, now);
    assert_eq!(updated.ready_at, now + Days::new(1));
    assert_eq!(updated.duration, ResetDuration::new(1, 0, 0, 0));
    assert_eq!(
        store.score_of(&record.id),
        Some(updated.ready_at_epoch_millis())
    );
}

#[tokio::test]
async fn edit_duration_missing_returns_false() {
    let (engine, _, _) = test_engine();
    let edited = engine
        .edit_duration(&StrongholdId::from_raw("404:0:0"), ResetDuration::RESET)
        .await
        .unwrap();
    assert!(!edited);
}

#[tokio::test]
async fn reset_applies_the_fixed_interval() {
    let (engine, _, clock) = test_engine();
    let record = engine
        .create(input(4, 4, 4, ResetDuration::new(0, 0, 30, 0)))
        .await
        .unwrap();

    clock.advance(TimeDelta::hours(1));
    assert!(engine.reset_timer(&record.id).await.unwrap());

    let updated = engine.list().await.pop().unwrap();
    let now = t0() + TimeDelta::hours(1);
    assert_eq!(updated.duration, ResetDuration::new(1, 12, 0, 0));
    assert_eq!(updated.ready_at, now + Days::new(1) + TimeDelta::hours(12));
}

#[tokio::test]
async fn level_is_write_once() {
    let (engine, _, _) = test_engine();
    let record = engine
        .create(
            input(1, 2, 3, ResetDuration::RESET)
                .with_level(5)
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(engine
        .edit_metadata(
            &record.id,
            Some("X".to_string()),
            Some(Level::new(9).unwrap()),
        )
        .await
        .unwrap());

    let updated = engine.list().await.pop().unwrap();
    assert_eq!(updated.level, Some(Level::new(5).unwrap()));
    assert_eq!(updated.alliance_name.as_deref(), Some("X"));
}

#[tokio::test]
async fn level_can_be_set_when_absent() {
    let (engine, _, _) = test_engine();
    let record = engine
        .create(input(1, 2, 3, ResetDuration::RESET))
        .await
        .unwrap();

    engine
        .edit_metadata(&record.id, None, Some(Level::new(7).unwrap()))
        .await
        .unwrap();

    let updated = engine.list().await.pop().unwrap();
    assert_eq!(updated.level, Some(Level::new(7).unwrap()));
}

#[tokio::test]
async fn omitting_alliance_clears_it() {
    let (engine, _, _) = test_engine();
    let record = engine
        .create(input(1, 2, 3, ResetDuration::RESET).with_alliance_name("NORD"))
        .await
        .unwrap();

    engine.edit_metadata(&record.id, None, None).await.unwrap();

    let updated = engine.list().await.pop().unwrap();
    assert_eq!(updated.alliance_name, None);
}

#[tokio::test]
async fn edit_metadata_does_not_touch_the_timer() {
    let (engine, store, clock) = test_engine();
    let record = engine
        .create(input(1, 2, 3, ResetDuration::RESET))
        .await
        .unwrap();

    clock.advance(TimeDelta::hours(6));
    engine
        .edit_metadata(&record.id, Some("Y".to_string()), None)
        .await
        .unwrap();

    let updated = engine.list().await.pop().unwrap();
    assert_eq!(updated.created_at, record.created_at);
    assert_eq!(updated.ready_at, record.ready_at);
    assert_eq!(
        store.score_of(&record.id),
        Some(record.ready_at_epoch_millis())
    );
}

#[tokio::test]
async fn edit_metadata_missing_returns_false() {
    let (engine, _, _) = test_engine();
    let edited = engine
        .edit_metadata(&StrongholdId::from_raw("404:0:0"), None, None)
        .await
        .unwrap();
    assert!(!edited);
}

#[tokio::test]
async fn write_failures_propagate() {
    let (engine, store, _) = test_engine();
    store.fail_writes();

    let result = engine.create(input(1, 2, 3, ResetDuration::RESET)).await;
    assert!(matches!(result, Err(EngineError::Store(_))));
}
