//! Core domain types for Redoubt.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application.

mod ids;
pub use ids::StrongholdId;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures rejected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("level must be in range [{min}, {max}], got {value}", min = Level::MIN, max = Level::MAX)]
    LevelOutOfRange { value: u8 },

    #[error("duration overflows the representable time range")]
    DurationOverflow,
}

// ============================================================================
// Level
// ============================================================================

/// Stronghold level, 1 through 10 inclusive.
///
/// Write-once: the engine keeps the stored value when a record already has
/// one, so a `Level` never changes after it is first set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::LevelOutOfRange { value })
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Level {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ResetDuration
// ============================================================================

/// Configured countdown length in days/hours/minutes/seconds.
///
/// Fields are kept separate rather than collapsed into a second count: the
/// caller-entered breakdown is part of the record and is re-displayed on
/// edit. Hour/minute/second fields are not range-capped; totals are
/// normalized by calendar arithmetic when the ready time is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetDuration {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ResetDuration {
    /// The fixed interval applied by the reset operation: 1 day 12 hours.
    pub const RESET: Self = Self::new(1, 12, 0, 0);

    #[must_use]
    pub const fn new(days: u32, hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    /// All-zero duration is legal and yields an immediately-ready entity.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl std::fmt::Display for ResetDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

// ============================================================================
// Stronghold
// ============================================================================

/// The canonical record for a tracked stronghold.
///
/// `ready_at` is derived from `created_at + duration` but persisted, so the
/// ordering index can sort without recomputation. `created_at` is the
/// countdown baseline: creation time initially, re-captured on every
/// duration edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stronghold {
    pub id: StrongholdId,
    pub warzone: i32,
    pub coordinate_x: i32,
    pub coordinate_y: i32,
    pub duration: ResetDuration,
    pub created_at: DateTime<Utc>,
    pub ready_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alliance_name: Option<String>,
}

impl Stronghold {
    /// The ordering index score: `ready_at` as epoch milliseconds.
    ///
    /// Index writes must use this exact value so record and index agree.
    #[must_use]
    pub fn ready_at_epoch_millis(&self) -> i64 {
        self.ready_at.timestamp_millis()
    }

    /// Whether the countdown has elapsed as of `now`.
    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.ready_at <= now
    }
}

// ============================================================================
// NewStronghold
// ============================================================================

/// Creation input: the caller-supplied fields of a stronghold.
///
/// Identity and timestamps are computed by the engine at creation time.
///
/// ```
/// use redoubt_types::{NewStronghold, ResetDuration};
///
/// let input = NewStronghold::new(12, 448, 512, ResetDuration::new(0, 8, 30, 0))
///     .with_level(5)
///     .unwrap()
///     .with_alliance_name("NORD");
/// # let _ = input;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStronghold {
    pub warzone: i32,
    pub coordinate_x: i32,
    pub coordinate_y: i32,
    pub duration: ResetDuration,
    pub level: Option<Level>,
    pub alliance_name: Option<String>,
}

impl NewStronghold {
    #[must_use]
    pub fn new(warzone: i32, coordinate_x: i32, coordinate_y: i32, duration: ResetDuration) -> Self {
        Self {
            warzone,
            coordinate_x,
            coordinate_y,
            duration,
            level: None,
            alliance_name: None,
        }
    }

    /// # Errors
    ///
    /// Returns `ValidationError::LevelOutOfRange` if `level` is outside
    /// [1, 10].
    pub fn with_level(mut self, level: u8) -> Result<Self, ValidationError> {
        self.level = Some(Level::new(level)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_alliance_name(mut self, name: impl Into<String>) -> Self {
        self.alliance_name = Some(name.into());
        self
    }

    /// The identifier this input resolves to.
    #[must_use]
    pub fn id(&self) -> StrongholdId {
        StrongholdId::from_parts(self.warzone, self.coordinate_x, self.coordinate_y)
    }
}
