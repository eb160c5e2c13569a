//! Multi-date scans over one provider's schedule.
//!
//! [`compute_available_dates`] answers "does this date have at least one free
//! slot" for every day of a month, and [`next_available_date`] finds the first
//! such date within a horizon starting today. Both delegate the per-date work
//! to [`compute_slots`], so a date is reported if and only if `compute_slots`
//! is non-empty for it.

use std::convert::Infallible;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::trace;

use crate::calendar::{date_span, YearMonth};
use crate::model::{BookedRange, DayOff, Slot, WorkingHoursRule};
use crate::slots::{compute_slots, AvailabilityQuery};

/// Read access to one provider's schedule data.
pub trait ScheduleSource {
    type Error;

    /// The active rule for `weekday`, if the provider works that day.
    fn working_hours(&self, weekday: Weekday) -> Result<Option<WorkingHoursRule>, Self::Error>;

    fn is_day_off(&self, date: NaiveDate) -> Result<bool, Self::Error>;

    /// Committed, non-canceled ranges on `date`.
    fn booked_ranges(&self, date: NaiveDate) -> Result<Vec<BookedRange>, Self::Error>;
}

/// An owned snapshot of one provider's schedule.
#[derive(Debug, Clone, Default)]
pub struct ProviderSchedule {
    pub working_hours: Vec<WorkingHoursRule>,
    pub days_off: Vec<DayOff>,
    /// May span several dates; ranges that miss a date cannot overlap its candidates.
    pub booked: Vec<BookedRange>,
}

impl ScheduleSource for ProviderSchedule {
    type Error = Infallible;

    fn working_hours(&self, weekday: Weekday) -> Result<Option<WorkingHoursRule>, Infallible> {
        Ok(self
            .working_hours
            .iter()
            .find(|rule| rule.applies_to(weekday))
            .cloned())
    }

    fn is_day_off(&self, date: NaiveDate) -> Result<bool, Infallible> {
        Ok(self.days_off.iter().any(|off| off.covers(date)))
    }

    fn booked_ranges(&self, _date: NaiveDate) -> Result<Vec<BookedRange>, Infallible> {
        Ok(self.booked.clone())
    }
}

/// Slots for `query.date`, with the provider data pulled from `source`.
pub fn slots_for_date<S: ScheduleSource>(
    query: &AvailabilityQuery,
    source: &S,
) -> Result<Vec<Slot>, S::Error> {
    let rule = source.working_hours(query.date.weekday())?;
    if rule.is_none() || query.date < query.today() {
        return Ok(Vec::new());
    }
    let day_off = source.is_day_off(query.date)?;
    if day_off {
        return Ok(Vec::new());
    }
    let booked = source.booked_ranges(query.date)?;
    Ok(compute_slots(query, rule.as_ref(), day_off, &booked))
}

/// Dates of `month` that have at least one free slot, ascending.
///
/// `query` serves as a template; its `date` is replaced by each day of the month.
pub fn compute_available_dates<S: ScheduleSource>(
    query: &AvailabilityQuery,
    month: YearMonth,
    source: &S,
) -> Result<Vec<NaiveDate>, S::Error> {
    let today = query.today();
    let mut dates = Vec::new();
    for date in month.days().filter(|d| *d >= today) {
        let slots = slots_for_date(&query.on(date), source)?;
        trace!(%date, slots = slots.len(), "scanned date");
        if !slots.is_empty() {
            dates.push(date);
        }
    }
    Ok(dates)
}

/// The first date, within `horizon_days` days starting today, with a free slot.
///
/// `query` serves as a template; its `date` is ignored.
pub fn next_available_date<S: ScheduleSource>(
    query: &AvailabilityQuery,
    horizon_days: u32,
    source: &S,
) -> Result<Option<NaiveDate>, S::Error> {
    for date in date_span(query.today(), horizon_days) {
        if !slots_for_date(&query.on(date), source)?.is_empty() {
            return Ok(Some(date));
        }
    }
    Ok(None)
}
