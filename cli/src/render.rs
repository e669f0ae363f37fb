//! Plain-text rendering of stronghold listings.

use chrono::{DateTime, Utc};
use redoubt_types::Stronghold;

/// Remaining time until `ready_at`, or `"ready"` once elapsed.
#[must_use]
pub fn format_remaining(ready_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = ready_at - now;
    if remaining <= chrono::TimeDelta::zero() {
        return "ready".to_string();
    }
    let total = remaining.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// One line per stronghold: identifier, metadata, ready time, countdown.
#[must_use]
pub fn format_listing(strongholds: &[Stronghold], now: DateTime<Utc>) -> String {
    if strongholds.is_empty() {
        return "no strongholds tracked".to_string();
    }
    let mut out = String::new();
    for record in strongholds {
        let mut tags = String::new();
        if let Some(alliance) = &record.alliance_name {
            tags.push_str(&format!("[{alliance}] "));
        }
        if let Some(level) = record.level {
            tags.push_str(&format!("lvl {level} "));
        }
        out.push_str(&format!(
            "{:<16} {}ready {} ({})\n",
            record.id.to_string(),
            tags,
            record.ready_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_remaining(record.ready_at, now),
        ));
    }
    out
}
