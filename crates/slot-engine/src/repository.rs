//! Data-access contracts the engine consumes, plus an in-memory implementation.
//!
//! The traits mirror what a host application's persistence layer provides.
//! [`InMemoryRepository`] backs the CLI and the tests; it can be loaded from a
//! JSON fixture and shared across threads.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{RepoResult, RepositoryError};
use crate::model::{
    Appointment, AppointmentId, AppointmentStatus, BookedRange, DayOff, ProviderId, Service,
    ServiceId, WorkingHoursRule,
};

/// Appointment states that never block a provider's calendar.
pub const DEFAULT_EXCLUDED_STATUSES: &[AppointmentStatus] = &[AppointmentStatus::Canceled];

pub trait WorkingHoursRepository {
    fn get_working_hours(
        &self,
        provider_id: ProviderId,
        day_of_week: Weekday,
    ) -> RepoResult<Option<WorkingHoursRule>>;
}

pub trait DayOffRepository {
    /// True when any day-off range of the provider contains `date`.
    fn is_day_off(&self, provider_id: ProviderId, date: NaiveDate) -> RepoResult<bool>;
}

pub trait AppointmentRepository {
    /// Occupied ranges of the provider's appointments on `date`, leaving out
    /// appointments whose status is in `excluding_statuses`.
    fn get_booked_ranges(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
        excluding_statuses: &[AppointmentStatus],
    ) -> RepoResult<Vec<BookedRange>>;
}

pub trait CatalogRepository {
    fn get_service(&self, service_id: ServiceId) -> RepoResult<Option<Service>>;

    fn provider_exists(&self, provider_id: ProviderId) -> RepoResult<bool>;
}

/// Inserting an appointment only after re-checking availability.
pub trait AppointmentWriter {
    /// Read the provider's booked ranges on `date` (canceled excluded), pass
    /// them to `check`, and insert `appointment` only if `check` returns true.
    /// Reading, checking and inserting happen in one critical section.
    ///
    /// Returns the new appointment's id, or `None` when `check` refused.
    fn commit_if<F>(
        &self,
        appointment: NewAppointment,
        check: F,
    ) -> RepoResult<Option<AppointmentId>>
    where
        F: FnOnce(&[BookedRange]) -> bool;
}

/// Everything the availability service needs from persistence.
pub trait Repository:
    WorkingHoursRepository + DayOffRepository + AppointmentRepository + CatalogRepository
{
}

impl<T> Repository for T where
    T: WorkingHoursRepository + DayOffRepository + AppointmentRepository + CatalogRepository
{
}

/// An appointment about to be inserted; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub start_time: chrono::NaiveTime,
    pub end_time: chrono::NaiveTime,
    pub status: AppointmentStatus,
}

/// JSON fixture layout accepted by [`InMemoryRepository::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub services: Vec<Service>,
    pub providers: Vec<ProviderId>,
    pub working_hours: Vec<WorkingHoursRule>,
    pub days_off: Vec<DayOff>,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Default)]
struct Tables {
    services: Vec<Service>,
    providers: Vec<ProviderId>,
    working_hours: Vec<WorkingHoursRule>,
    days_off: Vec<DayOff>,
    appointments: Vec<Appointment>,
    next_appointment_id: u64,
}

impl Tables {
    fn booked_ranges(
        &self,
        tz: &Tz,
        provider_id: ProviderId,
        date: NaiveDate,
        excluding: &[AppointmentStatus],
    ) -> Vec<BookedRange> {
        self.appointments
            .iter()
            .filter(|a| a.provider_id == provider_id && a.date == date)
            .filter(|a| !excluding.contains(&a.status))
            .map(|a| {
                BookedRange::from_local(tz, date.and_time(a.start_time), a.end_time - a.start_time)
            })
            .collect()
    }
}

/// Thread-safe, in-process repository.
///
/// Appointment times are stored as local wall-clock values. A booked range
/// starts at the instant of `start_time` in the repository's timezone and
/// lasts `end_time - start_time`, so a block keeps its real length across a
/// DST transition.
#[derive(Debug)]
pub struct InMemoryRepository {
    timezone: Tz,
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new(timezone: Tz) -> Self {
        Self::from_fixture(timezone, Fixture::default())
    }

    pub fn from_fixture(timezone: Tz, fixture: Fixture) -> Self {
        let next_appointment_id = fixture
            .appointments
            .iter()
            .map(|a| a.id.0)
            .max()
            .unwrap_or(0)
            + 1;
        InMemoryRepository {
            timezone,
            tables: RwLock::new(Tables {
                services: fixture.services,
                providers: fixture.providers,
                working_hours: fixture.working_hours,
                days_off: fixture.days_off,
                appointments: fixture.appointments,
                next_appointment_id,
            }),
        }
    }

    /// # Errors
    /// Returns `RepositoryError::Fixture` when `json` does not match [`Fixture`].
    pub fn from_json(timezone: Tz, json: &str) -> RepoResult<Self> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(timezone, fixture))
    }

    pub fn add_service(&self, service: Service) -> RepoResult<()> {
        self.write()?.services.push(service);
        Ok(())
    }

    pub fn add_provider(&self, provider_id: ProviderId) -> RepoResult<()> {
        self.write()?.providers.push(provider_id);
        Ok(())
    }

    pub fn add_working_hours(&self, rule: WorkingHoursRule) -> RepoResult<()> {
        self.write()?.working_hours.push(rule);
        Ok(())
    }

    pub fn add_day_off(&self, day_off: DayOff) -> RepoResult<()> {
        self.write()?.days_off.push(day_off);
        Ok(())
    }

    /// Insert an appointment without any availability check.
    pub fn insert_appointment(&self, appointment: NewAppointment) -> RepoResult<AppointmentId> {
        Ok(insert(&mut *self.write()?, appointment))
    }

    pub fn set_status(&self, id: AppointmentId, status: AppointmentStatus) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables.appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) => {
                appointment.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn appointments(&self) -> RepoResult<Vec<Appointment>> {
        Ok(self.read()?.appointments.clone())
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }
}

fn insert(tables: &mut Tables, new: NewAppointment) -> AppointmentId {
    let id = AppointmentId(tables.next_appointment_id);
    tables.next_appointment_id += 1;
    tables.appointments.push(Appointment {
        id,
        provider_id: new.provider_id,
        service_id: new.service_id,
        date: new.date,
        start_time: new.start_time,
        end_time: new.end_time,
        status: new.status,
    });
    id
}

impl WorkingHoursRepository for InMemoryRepository {
    fn get_working_hours(
        &self,
        provider_id: ProviderId,
        day_of_week: Weekday,
    ) -> RepoResult<Option<WorkingHoursRule>> {
        Ok(self
            .read()?
            .working_hours
            .iter()
            .find(|rule| rule.provider_id == provider_id && rule.applies_to(day_of_week))
            .cloned())
    }
}

impl DayOffRepository for InMemoryRepository {
    fn is_day_off(&self, provider_id: ProviderId, date: NaiveDate) -> RepoResult<bool> {
        Ok(self
            .read()?
            .days_off
            .iter()
            .any(|off| off.provider_id == provider_id && off.covers(date)))
    }
}

impl AppointmentRepository for InMemoryRepository {
    fn get_booked_ranges(
        &self,
        provider_id: ProviderId,
        date: NaiveDate,
        excluding_statuses: &[AppointmentStatus],
    ) -> RepoResult<Vec<BookedRange>> {
        Ok(self
            .read()?
            .booked_ranges(&self.timezone, provider_id, date, excluding_statuses))
    }
}

impl CatalogRepository for InMemoryRepository {
    fn get_service(&self, service_id: ServiceId) -> RepoResult<Option<Service>> {
        Ok(self
            .read()?
            .services
            .iter()
            .find(|s| s.id == service_id)
            .cloned())
    }

    fn provider_exists(&self, provider_id: ProviderId) -> RepoResult<bool> {
        Ok(self.read()?.providers.contains(&provider_id))
    }
}

impl AppointmentWriter for InMemoryRepository {
    fn commit_if<F>(
        &self,
        appointment: NewAppointment,
        check: F,
    ) -> RepoResult<Option<AppointmentId>>
    where
        F: FnOnce(&[BookedRange]) -> bool,
    {
        let mut tables = self.write()?;
        let booked = tables.booked_ranges(
            &self.timezone,
            appointment.provider_id,
            appointment.date,
            DEFAULT_EXCLUDED_STATUSES,
        );
        if !check(&booked) {
            return Ok(None);
        }
        Ok(Some(insert(&mut tables, appointment)))
    }
}
