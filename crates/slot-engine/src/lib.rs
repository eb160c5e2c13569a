//! # slot-engine
//!
//! Deterministic appointment availability for booking front ends.
//!
//! Given a service (duration and buffers), a provider's weekly working hours,
//! day-off ranges and already-booked appointments, the engine computes the
//! bookable slots of a date, the dates of a month that have any free slot, and
//! whether one specific slot may still be booked. The engine is a pure function
//! of its inputs; `now` and all settings are injected.
//!
//! ## Modules
//!
//! - [`slots`] — single-date slot generation and the single-slot verdict
//! - [`scan`] — month scan and next-available-date search over a [`scan::ScheduleSource`]
//! - [`conflict`] — half-open interval overlap tests
//! - [`dst`] — wall-clock/instant conversion and DST gap policy
//! - [`calendar`] — date, time and month parsing; month walking
//! - [`config`] — injected site settings
//! - [`model`] — value objects
//! - [`repository`] — data-access traits and an in-memory implementation
//! - [`service`] — the request-level facade
//! - [`booking`] — commit-time re-check and insert
//! - [`error`] — Error types

pub mod booking;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod model;
pub mod repository;
pub mod scan;
pub mod service;
pub mod slots;

pub use booking::{BookingOutcome, BookingRequest};
pub use calendar::YearMonth;
pub use config::Config;
pub use dst::DstPolicy;
pub use error::{EngineError, RepositoryError};
pub use model::{
    Appointment, AppointmentId, AppointmentStatus, BookedRange, DayOff, ProviderId, Service,
    ServiceId, Slot, WorkingHoursRule,
};
pub use repository::InMemoryRepository;
pub use scan::{compute_available_dates, next_available_date, ProviderSchedule, ScheduleSource};
pub use service::{AvailabilityService, Clock, FixedClock, SystemClock};
pub use slots::{compute_slots, is_slot_available, AvailabilityQuery};
