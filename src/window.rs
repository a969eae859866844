//! Hour-aligned time windows for the archive fetch.

use chrono::{DateTime, DurationRound, TimeDelta, Timelike, Utc};

/// Truncates `t` to the top of its hour.
pub fn floor_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    // duration_trunc fails only outside the i64-nanosecond range (~1677..2262)
    t.duration_trunc(TimeDelta::hours(1)).unwrap_or_else(|_| {
        t.date_naive()
            .and_hms_opt(t.hour(), 0, 0)
            .map_or(t, |naive| naive.and_utc())
    })
}

/// Returns the `n` whole hours strictly before `end`'s hour, oldest first.
///
/// The last element is `floor_to_hour(end) - 1h`. `n == 0` yields an empty window.
pub fn past_hours(end: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
    let floored = floor_to_hour(end);
    (1..=n as i64)
        .rev()
        .map(|i| floored - TimeDelta::hours(i))
        .collect()
}
