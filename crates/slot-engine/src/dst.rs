//! DST transition policies for slot candidates.
//!
//! Slots are generated on the local wall clock. On a spring-forward day some
//! wall-clock times never happen; the policy decides whether a candidate that
//! touches such a time is still offered.

use chrono::{DateTime, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for candidates whose start falls in a DST gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop candidates that start at a wall-clock time that does not exist
    #[default]
    Skip,
    /// Keep wall-clock arithmetic as-is and offer the candidate anyway
    WallClock,
}

impl DstPolicy {
    /// Whether a candidate starting at `start` on the wall clock may be offered.
    pub fn admits(self, tz: &Tz, start: NaiveDateTime) -> bool {
        match self {
            DstPolicy::WallClock => true,
            DstPolicy::Skip => local_time_exists(tz, start),
        }
    }
}

/// True unless `local` falls inside a spring-forward gap in `tz`.
pub fn local_time_exists(tz: &Tz, local: NaiveDateTime) -> bool {
    tz.from_local_datetime(&local).earliest().is_some()
}

/// Convert a wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times (fall-back) resolve to the earlier instant. Times inside a
/// spring-forward gap are read with the offset in force before the gap, which
/// lands them the same distance past the transition.
pub fn to_instant(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let offset = tz.offset_from_utc_datetime(&local).fix();
            let utc = local - chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
            DateTime::from_naive_utc_and_offset(utc, Utc)
        }
    }
}

/// Project an absolute instant onto the wall clock of `tz`.
pub fn to_local(tz: &Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(tz).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn spring_forward_gap_is_detected() {
        let tz = chrono_tz::America::New_York;
        assert!(!local_time_exists(&tz, local(2026, 3, 8, 2, 30)));
        assert!(local_time_exists(&tz, local(2026, 3, 8, 3, 0)));
        assert!(local_time_exists(&tz, local(2026, 3, 8, 1, 59)));
    }

    #[test]
    fn skip_policy_rejects_gap_candidates_wall_clock_keeps_them() {
        let tz = chrono_tz::America::New_York;
        let start = local(2026, 3, 8, 2, 0);
        assert!(!DstPolicy::Skip.admits(&tz, start));
        assert!(DstPolicy::WallClock.admits(&tz, start));
        assert!(DstPolicy::Skip.admits(&tz, local(2026, 3, 8, 3, 0)));
    }

    #[test]
    fn gap_time_shifts_past_transition() {
        let tz = chrono_tz::America::New_York;
        // 02:30 EST would be 07:30 UTC, which is 03:30 EDT.
        let instant = to_instant(&tz, local(2026, 3, 8, 2, 30));
        assert_eq!(to_local(&tz, instant), local(2026, 3, 8, 3, 30));
    }

    #[test]
    fn ambiguous_time_resolves_to_earlier_instant() {
        let tz = chrono_tz::America::New_York;
        let instant = to_instant(&tz, local(2026, 11, 1, 1, 30));
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap());
    }

    #[test]
    fn utc_round_trips_untouched() {
        let tz = chrono_tz::UTC;
        let wall = local(2026, 6, 1, 12, 0);
        assert_eq!(to_local(&tz, to_instant(&tz, wall)), wall);
    }
}
