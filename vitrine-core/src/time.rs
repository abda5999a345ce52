//! Business-time helpers.
//!
//! All comparisons happen in UTC. Everything shown to people (event dates,
//! lockout expiry) is rendered in a single fixed zone, [`DISPLAY_TZ`],
//! independent of the server locale or the zone a client sent.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// The fixed named timezone used for display.
pub const DISPLAY_TZ: Tz = chrono_tz::Europe::Warsaw;

/// Normalise any zoned timestamp to UTC for storage and comparison.
pub fn to_utc<Z: TimeZone>(instant: &DateTime<Z>) -> DateTime<Utc> {
    instant.with_timezone(&Utc)
}

/// Render a UTC instant in the given display zone.
pub fn in_zone(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Render a UTC instant in [`DISPLAY_TZ`].
pub fn to_display(instant: DateTime<Utc>) -> DateTime<Tz> {
    in_zone(instant, DISPLAY_TZ)
}

/// Wall-clock time (`HH:MM:SS`) of an instant in [`DISPLAY_TZ`].
pub fn display_clock(instant: DateTime<Utc>) -> String {
    to_display(instant).format("%H:%M:%S").to_string()
}

/// The moment a reminder is due: `start - offset_minutes`.
pub fn reminder_instant(start: DateTime<Utc>, offset_minutes: i32) -> DateTime<Utc> {
    start - Duration::minutes(i64::from(offset_minutes))
}
