//! Value objects consumed and produced by the availability engine.
//!
//! Everything here is read-only input for a single calculation. None of these
//! types carry persistence concerns; the repository layer hands them over
//! already filtered (for instance, canceled appointments never become a
//! [`BookedRange`]).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Catalog identifier of a bookable service.
    ServiceId
);
id_type!(
    /// Identifier of the staff member whose calendar is being booked.
    ProviderId
);
id_type!(AppointmentId);

/// A bookable service: its core duration and the idle buffers around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub duration_minutes: u32,
    #[serde(default)]
    pub buffer_before_minutes: u32,
    #[serde(default)]
    pub buffer_after_minutes: u32,
}

impl Service {
    /// Minutes the provider's calendar is blocked by one booking of this
    /// service, buffers included.
    pub fn total_occupied_minutes(&self) -> i64 {
        i64::from(self.buffer_before_minutes)
            + i64::from(self.duration_minutes)
            + i64::from(self.buffer_after_minutes)
    }

    /// # Errors
    /// Returns `EngineError::InvalidService` when the duration is zero.
    pub fn validate(&self) -> Result<()> {
        if self.duration_minutes == 0 {
            return Err(EngineError::InvalidService(format!(
                "service {} has a zero duration",
                self.id
            )));
        }
        Ok(())
    }
}

/// A provider's recurring availability for one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursRule {
    pub provider_id: ProviderId,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl WorkingHoursRule {
    pub fn applies_to(&self, weekday: Weekday) -> bool {
        self.active && u32::from(self.day_of_week) == weekday.num_days_from_sunday()
    }
}

/// An inclusive date range during which the provider takes no bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOff {
    pub provider_id: ProviderId,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DayOff {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }
}

/// The occupied interval of a committed, non-canceled appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A bookable start time, computed fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SlotWire", try_from = "SlotWire")]
pub struct Slot {
    pub start_time: NaiveTime,
    pub display_label: String,
}

/// Wire shape of a [`Slot`]: `{"time": "HH:MM", "display": "..."}`.
#[derive(Serialize, Deserialize)]
struct SlotWire {
    time: String,
    display: String,
}

impl From<Slot> for SlotWire {
    fn from(slot: Slot) -> Self {
        SlotWire {
            time: slot.start_time.format("%H:%M").to_string(),
            display: slot.display_label,
        }
    }
}

impl TryFrom<SlotWire> for Slot {
    type Error = EngineError;

    fn try_from(wire: SlotWire) -> Result<Self> {
        Ok(Slot {
            start_time: crate::calendar::parse_time(&wire.time)?,
            display_label: wire.display,
        })
    }
}

/// Lifecycle state of an appointment as stored by the booking collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Canceled,
    NoShow,
}

/// A stored appointment. Times are local wall-clock times in the configured
/// timezone, the way the booking form captured them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: AppointmentStatus,
}
