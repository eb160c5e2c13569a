//! The availability facade callers talk to.
//!
//! [`AvailabilityService`] parses request inputs, resolves the service and
//! provider through the repository, and runs the engine against a
//! [`ScheduleSource`] view of that provider. Lookups fail fast with
//! `ServiceNotFound` / `ProviderNotFound` before any slot is computed.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use tracing::{debug, info, warn};

use crate::booking::{appointment_for, commit_check, BookingOutcome, BookingRequest};
use crate::calendar::{parse_date, parse_time, YearMonth};
use crate::config::Config;
use crate::error::{EngineError, RepositoryError, Result};
use crate::model::{BookedRange, ProviderId, ServiceId, Slot, WorkingHoursRule};
use crate::repository::{AppointmentWriter, Repository, DEFAULT_EXCLUDED_STATUSES};
use crate::scan::{self, ScheduleSource};
use crate::slots::{self, AvailabilityQuery};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One provider's schedule, read through the repository on demand.
struct ProviderView<'a, R> {
    repo: &'a R,
    provider_id: ProviderId,
}

impl<R: Repository> ScheduleSource for ProviderView<'_, R> {
    type Error = RepositoryError;

    fn working_hours(
        &self,
        weekday: Weekday,
    ) -> std::result::Result<Option<WorkingHoursRule>, RepositoryError> {
        self.repo.get_working_hours(self.provider_id, weekday)
    }

    fn is_day_off(&self, date: NaiveDate) -> std::result::Result<bool, RepositoryError> {
        self.repo.is_day_off(self.provider_id, date)
    }

    fn booked_ranges(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Vec<BookedRange>, RepositoryError> {
        self.repo
            .get_booked_ranges(self.provider_id, date, DEFAULT_EXCLUDED_STATUSES)
    }
}

pub struct AvailabilityService<R, C = SystemClock> {
    repo: R,
    config: Config,
    clock: C,
}

impl<R: Repository> AvailabilityService<R, SystemClock> {
    /// # Errors
    /// Returns `EngineError::InvalidConfig` when `config` fails validation.
    pub fn new(repo: R, config: Config) -> Result<Self> {
        Self::with_clock(repo, config, SystemClock)
    }
}

impl<R: Repository, C: Clock> AvailabilityService<R, C> {
    /// # Errors
    /// Returns `EngineError::InvalidConfig` when `config` fails validation.
    pub fn with_clock(repo: R, config: Config, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(AvailabilityService {
            repo,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Dates of `year_month` (`YYYY-MM`) with at least one free slot.
    pub fn get_available_dates(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        year_month: &str,
    ) -> Result<Vec<NaiveDate>> {
        let month: YearMonth = year_month.parse()?;
        let query = self.query(service_id, provider_id, month.first_day())?;
        let dates = scan::compute_available_dates(&query, month, &self.view(provider_id))?;
        debug!(%service_id, %provider_id, %month, found = dates.len(), "computed available dates");
        Ok(dates)
    }

    /// Free slots on `date` (`YYYY-MM-DD`).
    pub fn get_available_slots(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        date: &str,
    ) -> Result<Vec<Slot>> {
        let date = parse_date(date)?;
        let query = self.query(service_id, provider_id, date)?;
        let slots = scan::slots_for_date(&query, &self.view(provider_id))?;
        debug!(%service_id, %provider_id, %date, found = slots.len(), "computed available slots");
        Ok(slots)
    }

    /// Whether `time` (`HH:MM`) on `date` is currently bookable.
    pub fn is_slot_available(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        date: &str,
        time: &str,
    ) -> Result<bool> {
        let date = parse_date(date)?;
        let time = parse_time(time)?;
        let query = self.query(service_id, provider_id, date)?;
        let view = self.view(provider_id);
        let rule = view.working_hours(date.weekday())?;
        let day_off = view.is_day_off(date)?;
        let booked = view.booked_ranges(date)?;
        Ok(slots::is_slot_available(
            &query,
            rule.as_ref(),
            day_off,
            &booked,
            time,
        ))
    }

    /// First date within `horizon_days` from today with a free slot.
    pub fn next_available_date(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        horizon_days: u32,
    ) -> Result<Option<NaiveDate>> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.config.timezone).date_naive();
        let query = self.query_at(service_id, provider_id, today, now)?;
        let found = scan::next_available_date(&query, horizon_days, &self.view(provider_id))?;
        debug!(%service_id, %provider_id, horizon_days, ?found, "scanned for next available date");
        Ok(found)
    }

    /// Same as [`next_available_date`](Self::next_available_date) with the configured horizon.
    pub fn next_available_date_default(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
    ) -> Result<Option<NaiveDate>> {
        self.next_available_date(service_id, provider_id, self.config.horizon_days)
    }

    fn query(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<AvailabilityQuery> {
        self.query_at(service_id, provider_id, date, self.clock.now())
    }

    fn query_at(
        &self,
        service_id: ServiceId,
        provider_id: ProviderId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AvailabilityQuery> {
        let service = self
            .repo
            .get_service(service_id)?
            .ok_or(EngineError::ServiceNotFound(service_id))?;
        service.validate()?;
        if !self.repo.provider_exists(provider_id)? {
            return Err(EngineError::ProviderNotFound(provider_id));
        }
        Ok(self.config.query(service, provider_id, date, now))
    }

    fn view(&self, provider_id: ProviderId) -> ProviderView<'_, R> {
        ProviderView {
            repo: &self.repo,
            provider_id,
        }
    }
}

impl<R: Repository + AppointmentWriter, C: Clock> AvailabilityService<R, C> {
    /// Book `request.time` if it is still free.
    ///
    /// Working hours and days off are read first; the booked ranges are read,
    /// re-checked and extended inside the repository's critical section.
    ///
    /// # Errors
    /// Lookup and repository failures only. A taken slot is
    /// `Ok(BookingOutcome::SlotUnavailable)`.
    pub fn book(&self, request: &BookingRequest) -> Result<BookingOutcome> {
        let query = self.query(request.service_id, request.provider_id, request.date)?;
        let view = self.view(request.provider_id);
        let rule = view.working_hours(request.date.weekday())?;
        let day_off = view.is_day_off(request.date)?;

        let appointment = appointment_for(&query, request.time);
        let check = commit_check(&query, rule.as_ref(), day_off, request.time);
        match self.repo.commit_if(appointment, check)? {
            Some(id) => {
                info!(
                    appointment_id = %id,
                    service_id = %request.service_id,
                    provider_id = %request.provider_id,
                    date = %request.date,
                    time = %request.time,
                    "booked appointment"
                );
                Ok(BookingOutcome::Booked(id))
            }
            None => {
                warn!(
                    service_id = %request.service_id,
                    provider_id = %request.provider_id,
                    date = %request.date,
                    time = %request.time,
                    "slot no longer available"
                );
                Ok(BookingOutcome::SlotUnavailable)
            }
        }
    }
}
