//! Booking commit: re-derive the availability verdict inside the repository's
//! critical section, then insert.
//!
//! A slot list fetched earlier may be stale by the time the customer submits.
//! "Slot no longer available" is therefore an ordinary outcome, not an error.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::{
    AppointmentId, AppointmentStatus, BookedRange, ProviderId, ServiceId, WorkingHoursRule,
};
use crate::repository::NewAppointment;
use crate::slots::{is_slot_available, occupied_wall_clock, AvailabilityQuery};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: ServiceId,
    pub provider_id: ProviderId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "appointment_id", rename_all = "snake_case")]
pub enum BookingOutcome {
    Booked(AppointmentId),
    /// Someone else took the slot, or it was never offered. Re-fetch and re-offer.
    SlotUnavailable,
}

/// The appointment a successful commit of `time` inserts.
///
/// It spans the whole occupied interval, buffers included, so the committed
/// range blocks exactly what the engine reserved for it.
pub(crate) fn appointment_for(query: &AvailabilityQuery, time: NaiveTime) -> NewAppointment {
    let (start, end) = occupied_wall_clock(query, time);
    NewAppointment {
        provider_id: query.provider_id,
        service_id: query.service.id,
        date: query.date,
        start_time: start.time(),
        end_time: end.time(),
        status: AppointmentStatus::Pending,
    }
}

/// The availability check handed to
/// [`AppointmentWriter::commit_if`](crate::repository::AppointmentWriter::commit_if).
pub(crate) fn commit_check<'a>(
    query: &'a AvailabilityQuery,
    rule: Option<&'a WorkingHoursRule>,
    day_off: bool,
    time: NaiveTime,
) -> impl FnOnce(&[BookedRange]) -> bool + 'a {
    move |booked| is_slot_available(query, rule, day_off, booked, time)
}
