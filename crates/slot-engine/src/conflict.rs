//! Overlap tests between a candidate's occupied range and booked ranges.
//!
//! Ranges are half-open `[start, end)` in absolute time. Adjacent ranges,
//! where one ends exactly when the other starts, do NOT conflict. Comparing
//! instants rather than wall-clock values keeps the test exact on DST
//! transition days, where an hour on the wall clock is not an hour of time.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::dst;
use crate::model::BookedRange;

impl BookedRange {
    /// The range a block of `length` occupies when it starts at wall-clock
    /// `start` in `tz`.
    pub fn from_local(tz: &Tz, start: NaiveDateTime, length: Duration) -> Self {
        let start = dst::to_instant(tz, start);
        BookedRange {
            start,
            end: start + length,
        }
    }

    /// `a.start < b.end && a.end > b.start`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// The first booked range that `candidate` overlaps, scanning in input order.
pub fn first_conflict<'a>(
    candidate: &BookedRange,
    booked: &'a [BookedRange],
) -> Option<&'a BookedRange> {
    booked
        .iter()
        .find(|b| b.overlaps(candidate.start, candidate.end))
}
