//! Hash field codec for stronghold records.
//!
//! Redis hashes hold flat string pairs, so the record is spread across one
//! field per attribute. Timestamps are RFC 3339 with millisecond precision;
//! the ordering index score is derived from the same parsed value, so a
//! round trip through the store preserves score agreement.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use redoubt_types::{Level, ResetDuration, Stronghold, StrongholdId};

use crate::StoreError;

const F_ID: &str = "id";
const F_WARZONE: &str = "warzone";
const F_COORD_X: &str = "coordinate_x";
const F_COORD_Y: &str = "coordinate_y";
const F_DAYS: &str = "duration_days";
const F_HOURS: &str = "duration_hours";
const F_MINUTES: &str = "duration_minutes";
const F_SECONDS: &str = "duration_seconds";
const F_CREATED_AT: &str = "created_at";
const F_READY_AT: &str = "ready_at";
const F_LEVEL: &str = "level";
const F_ALLIANCE: &str = "alliance_name";

/// Flatten a record into hash field pairs.
///
/// Optional fields are simply omitted when unset; the writer replaces the
/// whole hash, so omission clears a previously stored value.
#[must_use]
pub fn encode(record: &Stronghold) -> Vec<(String, String)> {
    let mut fields = vec![
        (F_ID.to_string(), record.id.to_string()),
        (F_WARZONE.to_string(), record.warzone.to_string()),
        (F_COORD_X.to_string(), record.coordinate_x.to_string()),
        (F_COORD_Y.to_string(), record.coordinate_y.to_string()),
        (F_DAYS.to_string(), record.duration.days.to_string()),
        (F_HOURS.to_string(), record.duration.hours.to_string()),
        (F_MINUTES.to_string(), record.duration.minutes.to_string()),
        (F_SECONDS.to_string(), record.duration.seconds.to_string()),
        (F_CREATED_AT.to_string(), format_timestamp(record.created_at)),
        (F_READY_AT.to_string(), format_timestamp(record.ready_at)),
    ];
    if let Some(level) = record.level {
        fields.push((F_LEVEL.to_string(), level.value().to_string()));
    }
    if let Some(alliance) = &record.alliance_name {
        fields.push((F_ALLIANCE.to_string(), alliance.clone()));
    }
    fields
}

/// Rebuild a record from the flat `HGETALL` reply
/// (`[field, value, field, value, ...]`).
pub fn decode_flat(flat: &[String]) -> Result<Stronghold, StoreError> {
    if flat.len() % 2 != 0 {
        return Err(StoreError::Corrupt(format!(
            "hash reply has odd length {}",
            flat.len()
        )));
    }
    let map: HashMap<&str, &str> = flat
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
        .collect();
    decode(&map)
}

fn decode(map: &HashMap<&str, &str>) -> Result<Stronghold, StoreError> {
    let level = map
        .get(F_LEVEL)
        .map(|raw| {
            let value = parse_int::<u8>(F_LEVEL, raw)?;
            Level::new(value)
                .map_err(|e| StoreError::Corrupt(format!("field '{F_LEVEL}': {e}")))
        })
        .transpose()?;

    Ok(Stronghold {
        id: StrongholdId::from_raw(required(map, F_ID)?),
        warzone: parse_int(F_WARZONE, required(map, F_WARZONE)?)?,
        coordinate_x: parse_int(F_COORD_X, required(map, F_COORD_X)?)?,
        coordinate_y: parse_int(F_COORD_Y, required(map, F_COORD_Y)?)?,
        duration: ResetDuration {
            days: parse_int(F_DAYS, required(map, F_DAYS)?)?,
            hours: parse_int(F_HOURS, required(map, F_HOURS)?)?,
            minutes: parse_int(F_MINUTES, required(map, F_MINUTES)?)?,
            seconds: parse_int(F_SECONDS, required(map, F_SECONDS)?)?,
        },
        created_at: parse_timestamp(F_CREATED_AT, required(map, F_CREATED_AT)?)?,
        ready_at: parse_timestamp(F_READY_AT, required(map, F_READY_AT)?)?,
        level,
        alliance_name: map.get(F_ALLIANCE).map(|s| (*s).to_string()),
    })
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required<'a>(map: &HashMap<&str, &'a str>, field: &str) -> Result<&'a str, StoreError> {
    map.get(field)
        .copied()
        .ok_or_else(|| StoreError::Corrupt(format!("missing field '{field}'")))
}

fn parse_int<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("field '{field}' is not a valid integer: {raw:?}")))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("field '{field}' is not a timestamp: {e}")))
}
