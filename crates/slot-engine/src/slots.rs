//! Single-date slot generation.
//!
//! Walks slot-aligned candidate start times through the provider's working
//! window and keeps every candidate whose occupied interval (buffers included)
//! stays inside the window and clear of all booked ranges.
//!
//! The working window, the grid and the same-day cutoff live on the local wall
//! clock of the query's timezone; `now` is projected onto it once, so "today"
//! and "in the past" are always judged in the same frame. Overlap with booked
//! ranges is tested in absolute time: each candidate start is converted to an
//! instant and occupies `total` minutes of real time from there.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::conflict::first_conflict;
use crate::dst::{self, DstPolicy};
use crate::model::{BookedRange, ProviderId, Service, Slot, WorkingHoursRule};

/// Everything one slot calculation depends on besides the provider's data.
///
/// Usually built with [`Config::query`](crate::config::Config::query).
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    pub service: Service,
    pub provider_id: ProviderId,
    pub date: NaiveDate,
    pub slot_granularity_minutes: u32,
    pub now: DateTime<Utc>,
    pub timezone: Tz,
    pub min_notice_minutes: u32,
    pub time_format: String,
    pub dst_policy: DstPolicy,
}

impl AvailabilityQuery {
    /// The same query for a different date.
    pub fn on(&self, date: NaiveDate) -> Self {
        AvailabilityQuery {
            date,
            ..self.clone()
        }
    }

    /// `now` on the wall clock of the configured timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        dst::to_local(&self.timezone, self.now)
    }

    /// The civil date of `now` in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    /// Earliest offerable start on `self.date` when it is today: `now` plus the
    /// minimum notice, rounded up to the next granularity boundary counted from
    /// local midnight.
    fn same_day_cutoff(&self) -> NaiveDateTime {
        let midnight = self.date.and_time(NaiveTime::MIN);
        let earliest = self.local_now() + Duration::minutes(i64::from(self.min_notice_minutes));
        let step = i64::from(self.slot_granularity_minutes) * 60;
        let elapsed = (earliest - midnight).num_seconds();
        let aligned = (elapsed + step - 1).div_euclid(step) * step;
        midnight + Duration::seconds(aligned)
    }
}

/// Compute the bookable slots for `query.date`.
///
/// Returns an empty list when the provider has no active rule for the date's
/// weekday, the date is a day off, the date lies before today, or no candidate
/// fits. The result is in ascending start order and depends only on the inputs.
pub fn compute_slots(
    query: &AvailabilityQuery,
    working_hours: Option<&WorkingHoursRule>,
    day_off: bool,
    booked: &[BookedRange],
) -> Vec<Slot> {
    let Some(rule) = working_hours else {
        return Vec::new();
    };
    if day_off || !rule.active || query.date < query.today() {
        return Vec::new();
    }
    if query.service.duration_minutes == 0 || query.slot_granularity_minutes == 0 {
        return Vec::new();
    }

    let total = Duration::minutes(query.service.total_occupied_minutes());
    let step = Duration::minutes(i64::from(query.slot_granularity_minutes));

    let mut window_start = query.date.and_time(rule.start_time);
    let window_end = query.date.and_time(rule.end_time);
    if query.date == query.today() {
        window_start = window_start.max(query.same_day_cutoff());
    }
    let last_start = window_end - total;

    let tz = &query.timezone;
    let mut slots = Vec::new();
    let mut candidate = window_start;
    while candidate <= last_start {
        let occupied = BookedRange::from_local(tz, candidate, total);
        if query.dst_policy.admits(tz, candidate) && first_conflict(&occupied, booked).is_none() {
            slots.push(Slot {
                start_time: candidate.time(),
                display_label: candidate.format(&query.time_format).to_string(),
            });
        }
        candidate += step;
    }
    slots
}

/// Whether `candidate_time` is one of the slots [`compute_slots`] would offer.
///
/// Meant to be re-run against freshly read booked ranges at commit time.
pub fn is_slot_available(
    query: &AvailabilityQuery,
    working_hours: Option<&WorkingHoursRule>,
    day_off: bool,
    booked: &[BookedRange],
    candidate_time: NaiveTime,
) -> bool {
    compute_slots(query, working_hours, day_off, booked)
        .iter()
        .any(|slot| slot.start_time == candidate_time)
}

/// Wall-clock start and end of the block a booking at `start_time` reserves.
pub fn occupied_wall_clock(
    query: &AvailabilityQuery,
    start_time: NaiveTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = query.date.and_time(start_time);
    (
        start,
        start + Duration::minutes(query.service.total_occupied_minutes()),
    )
}
