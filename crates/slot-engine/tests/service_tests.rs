//! Tests for the availability facade, the in-memory repository and booking commits.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use slot_engine::repository::{
    AppointmentRepository, AppointmentWriter, CatalogRepository, DayOffRepository, NewAppointment,
    WorkingHoursRepository, DEFAULT_EXCLUDED_STATUSES,
};
use slot_engine::{
    AppointmentStatus, AvailabilityService, BookedRange, BookingOutcome, BookingRequest, Config,
    DayOff, EngineError, FixedClock, InMemoryRepository, ProviderId, RepositoryError, Service,
    ServiceId, WorkingHoursRule,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

const HAIRCUT: ServiceId = ServiceId(10);
const COLORING: ServiceId = ServiceId(11);
const ALICE: ProviderId = ProviderId(1);

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new(chrono_tz::UTC);
    repo.add_service(Service {
        id: HAIRCUT,
        duration_minutes: 60,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
    })
    .unwrap();
    repo.add_service(Service {
        id: COLORING,
        duration_minutes: 60,
        buffer_before_minutes: 15,
        buffer_after_minutes: 15,
    })
    .unwrap();
    repo.add_provider(ALICE).unwrap();
    for day_of_week in 1..=5 {
        repo.add_working_hours(WorkingHoursRule {
            provider_id: ALICE,
            day_of_week,
            start_time: hm(9, 0),
            end_time: hm(17, 0),
            active: true,
        })
        .unwrap();
    }
    repo
}

fn service_at(
    repo: InMemoryRepository,
    now: DateTime<Utc>,
) -> AvailabilityService<InMemoryRepository, FixedClock> {
    AvailabilityService::with_clock(repo, Config::default(), FixedClock(now)).unwrap()
}

fn appointment(on: NaiveDate, start: NaiveTime, end: NaiveTime) -> NewAppointment {
    NewAppointment {
        provider_id: ALICE,
        service_id: HAIRCUT,
        date: on,
        start_time: start,
        end_time: end,
        status: AppointmentStatus::Confirmed,
    }
}

fn times(slots: &[slot_engine::Slot]) -> Vec<String> {
    slots
        .iter()
        .map(|s| s.start_time.format("%H:%M").to_string())
        .collect()
}

// ── Repository contracts ────────────────────────────────────────────────────

#[test]
fn canceled_appointments_are_not_booked_ranges() {
    let repo = seeded_repo();
    let wed = date(2026, 3, 4);
    let kept = repo.insert_appointment(appointment(wed, hm(9, 0), hm(10, 0))).unwrap();
    let canceled = repo.insert_appointment(appointment(wed, hm(11, 0), hm(12, 0))).unwrap();
    repo.set_status(canceled, AppointmentStatus::Canceled).unwrap();

    let ranges = repo
        .get_booked_ranges(ALICE, wed, DEFAULT_EXCLUDED_STATUSES)
        .unwrap();
    assert_eq!(
        ranges,
        [BookedRange {
            start: utc(2026, 3, 4, 9, 0),
            end: utc(2026, 3, 4, 10, 0),
        }]
    );

    let everything = repo.get_booked_ranges(ALICE, wed, &[]).unwrap();
    assert_eq!(everything.len(), 2);
    assert_ne!(kept, canceled);
}

#[test]
fn booked_ranges_are_scoped_to_provider_and_date() {
    let repo = seeded_repo();
    repo.insert_appointment(appointment(date(2026, 3, 4), hm(9, 0), hm(10, 0)))
        .unwrap();
    repo.insert_appointment(NewAppointment {
        provider_id: ProviderId(2),
        ..appointment(date(2026, 3, 5), hm(9, 0), hm(10, 0))
    })
    .unwrap();

    assert!(repo
        .get_booked_ranges(ALICE, date(2026, 3, 5), DEFAULT_EXCLUDED_STATUSES)
        .unwrap()
        .is_empty());
    assert!(repo
        .get_booked_ranges(ProviderId(2), date(2026, 3, 4), DEFAULT_EXCLUDED_STATUSES)
        .unwrap()
        .is_empty());
}

#[test]
fn local_appointment_times_use_repository_timezone() {
    let repo = InMemoryRepository::new(chrono_tz::Europe::Berlin);
    repo.insert_appointment(appointment(date(2026, 7, 1), hm(9, 0), hm(10, 0)))
        .unwrap();

    let ranges = repo
        .get_booked_ranges(ALICE, date(2026, 7, 1), DEFAULT_EXCLUDED_STATUSES)
        .unwrap();
    // Berlin is UTC+2 in summer.
    assert_eq!(ranges[0].start, utc(2026, 7, 1, 7, 0));
    assert_eq!(ranges[0].end, utc(2026, 7, 1, 8, 0));
}

#[test]
fn day_off_lookup_is_inclusive_range_check() {
    let repo = seeded_repo();
    repo.add_day_off(DayOff {
        provider_id: ALICE,
        date_start: date(2026, 3, 9),
        date_end: date(2026, 3, 11),
        reason: None,
    })
    .unwrap();

    assert!(!repo.is_day_off(ALICE, date(2026, 3, 8)).unwrap());
    assert!(repo.is_day_off(ALICE, date(2026, 3, 9)).unwrap());
    assert!(repo.is_day_off(ALICE, date(2026, 3, 11)).unwrap());
    assert!(!repo.is_day_off(ALICE, date(2026, 3, 12)).unwrap());
    assert!(!repo.is_day_off(ProviderId(2), date(2026, 3, 10)).unwrap());
}

#[test]
fn working_hours_lookup_by_weekday() {
    let repo = seeded_repo();
    assert!(repo.get_working_hours(ALICE, Weekday::Mon).unwrap().is_some());
    assert!(repo.get_working_hours(ALICE, Weekday::Sun).unwrap().is_none());
    assert!(repo.get_service(ServiceId(99)).unwrap().is_none());
    assert!(!repo.provider_exists(ProviderId(99)).unwrap());
}

#[test]
fn fixture_json_loads_all_tables() {
    let json = r#"{
        "services": [{"id": 1, "duration_minutes": 30}],
        "providers": [5],
        "working_hours": [
            {"provider_id": 5, "day_of_week": 3, "start_time": "09:00:00", "end_time": "12:00:00"}
        ],
        "days_off": [
            {"provider_id": 5, "date_start": "2026-03-11", "date_end": "2026-03-11"}
        ],
        "appointments": [
            {"id": 41, "provider_id": 5, "service_id": 1, "date": "2026-03-04",
             "start_time": "09:00:00", "end_time": "09:30:00", "status": "confirmed"}
        ]
    }"#;
    let repo = InMemoryRepository::from_json(chrono_tz::UTC, json).unwrap();

    assert!(repo.provider_exists(ProviderId(5)).unwrap());
    assert!(repo.is_day_off(ProviderId(5), date(2026, 3, 11)).unwrap());
    let rule = repo.get_working_hours(ProviderId(5), Weekday::Wed).unwrap().unwrap();
    assert!(rule.active, "active defaults to true");

    // New ids continue after the highest fixture id.
    let id = repo
        .insert_appointment(NewAppointment {
            provider_id: ProviderId(5),
            ..appointment(date(2026, 3, 4), hm(10, 0), hm(10, 30))
        })
        .unwrap();
    assert_eq!(id.0, 42);
}

#[test]
fn malformed_fixture_is_a_repository_error() {
    let err = InMemoryRepository::from_json(chrono_tz::UTC, "{\"services\": 3}").unwrap_err();
    assert!(matches!(err, RepositoryError::Fixture(_)));
}

#[test]
fn appointment_in_repeated_hour_keeps_its_length() {
    // 2026-11-01: 01:30 happens twice in New York; the first one is 05:30 UTC.
    let repo = InMemoryRepository::new(chrono_tz::America::New_York);
    repo.insert_appointment(appointment(date(2026, 11, 1), hm(1, 30), hm(2, 30)))
        .unwrap();

    let ranges = repo
        .get_booked_ranges(ALICE, date(2026, 11, 1), DEFAULT_EXCLUDED_STATUSES)
        .unwrap();
    assert_eq!(
        ranges,
        [BookedRange {
            start: utc(2026, 11, 1, 5, 30),
            end: utc(2026, 11, 1, 6, 30),
        }]
    );
}

// ── Facade ──────────────────────────────────────────────────────────────────

#[test]
fn slots_through_facade_honour_bookings() {
    let repo = seeded_repo();
    repo.insert_appointment(appointment(date(2026, 3, 4), hm(10, 0), hm(11, 0)))
        .unwrap();
    let svc = service_at(repo, utc(2026, 3, 2, 8, 0));

    let slots = svc.get_available_slots(HAIRCUT, ALICE, "2026-03-04").unwrap();

    assert_eq!(times(&slots)[..3], ["09:00", "11:00", "11:30"]);
    assert_eq!(slots.len(), 12);
}

#[test]
fn buffered_service_through_facade() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));

    let slots = svc.get_available_slots(COLORING, ALICE, "2026-03-04").unwrap();

    assert_eq!(times(&slots).last().map(String::as_str), Some("15:30"));
}

#[test]
fn available_dates_for_month() {
    let repo = seeded_repo();
    repo.add_day_off(DayOff {
        provider_id: ALICE,
        date_start: date(2026, 3, 30),
        date_end: date(2026, 4, 3),
        reason: Some("conference".to_string()),
    })
    .unwrap();
    let svc = service_at(repo, utc(2026, 3, 25, 12, 0));

    let dates = svc.get_available_dates(HAIRCUT, ALICE, "2026-03").unwrap();

    assert_eq!(
        dates,
        [date(2026, 3, 25), date(2026, 3, 26), date(2026, 3, 27)]
    );
}

#[test]
fn malformed_inputs_are_rejected_before_lookup() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));

    assert!(matches!(
        svc.get_available_dates(HAIRCUT, ALICE, "2026-3"),
        Err(EngineError::InvalidDate(_))
    ));
    assert!(matches!(
        svc.get_available_slots(HAIRCUT, ALICE, "04/03/2026"),
        Err(EngineError::InvalidDate(_))
    ));
    assert!(matches!(
        svc.is_slot_available(HAIRCUT, ALICE, "2026-03-04", "nine"),
        Err(EngineError::InvalidTime(_))
    ));
}

#[test]
fn unknown_service_or_provider_fails_fast() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));

    let err = svc
        .get_available_slots(ServiceId(404), ALICE, "2026-03-04")
        .unwrap_err();
    assert!(matches!(err, EngineError::ServiceNotFound(ServiceId(404))));
    assert!(!err.is_retryable());

    let err = svc
        .next_available_date(HAIRCUT, ProviderId(404), 30)
        .unwrap_err();
    assert!(matches!(err, EngineError::ProviderNotFound(ProviderId(404))));
}

#[test]
fn zero_duration_service_is_invalid() {
    let repo = seeded_repo();
    repo.add_service(Service {
        id: ServiceId(12),
        duration_minutes: 0,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
    })
    .unwrap();
    let svc = service_at(repo, utc(2026, 3, 2, 8, 0));

    assert!(matches!(
        svc.get_available_slots(ServiceId(12), ALICE, "2026-03-04"),
        Err(EngineError::InvalidService(_))
    ));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = Config {
        slot_granularity_minutes: 0,
        ..Config::default()
    };
    let result =
        AvailabilityService::with_clock(seeded_repo(), config, FixedClock(utc(2026, 3, 2, 8, 0)));
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}

#[test]
fn next_available_date_uses_configured_horizon() {
    let repo = seeded_repo();
    repo.add_day_off(DayOff {
        provider_id: ALICE,
        date_start: date(2026, 3, 2),
        date_end: date(2026, 6, 30),
        reason: None,
    })
    .unwrap();
    let svc = service_at(repo, utc(2026, 3, 2, 8, 0));

    assert_eq!(svc.next_available_date_default(HAIRCUT, ALICE).unwrap(), None);
    assert_eq!(
        svc.next_available_date(HAIRCUT, ALICE, 150).unwrap(),
        Some(date(2026, 7, 1))
    );
}

#[test]
fn nothing_free_is_not_an_error() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));

    // Saturday.
    assert!(svc.get_available_slots(HAIRCUT, ALICE, "2026-03-07").unwrap().is_empty());
    assert!(!svc.is_slot_available(HAIRCUT, ALICE, "2026-03-07", "09:00").unwrap());
}

// ── Booking commit ──────────────────────────────────────────────────────────

#[test]
fn booking_blocks_the_slot_for_the_next_caller() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));
    let request = BookingRequest {
        service_id: HAIRCUT,
        provider_id: ALICE,
        date: date(2026, 3, 4),
        time: hm(10, 0),
    };

    assert!(svc.is_slot_available(HAIRCUT, ALICE, "2026-03-04", "10:00").unwrap());
    assert!(matches!(svc.book(&request).unwrap(), BookingOutcome::Booked(_)));
    assert_eq!(svc.book(&request).unwrap(), BookingOutcome::SlotUnavailable);

    assert!(!svc.is_slot_available(HAIRCUT, ALICE, "2026-03-04", "10:00").unwrap());
    assert!(!svc.is_slot_available(HAIRCUT, ALICE, "2026-03-04", "10:30").unwrap());
    assert!(svc.is_slot_available(HAIRCUT, ALICE, "2026-03-04", "11:00").unwrap());
}

#[test]
fn booking_on_spring_forward_day_blocks_real_overlaps() {
    let tz = chrono_tz::America::New_York;
    let repo = InMemoryRepository::new(tz);
    repo.add_service(Service {
        id: HAIRCUT,
        duration_minutes: 60,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
    })
    .unwrap();
    repo.add_provider(ALICE).unwrap();
    repo.add_working_hours(WorkingHoursRule {
        provider_id: ALICE,
        day_of_week: 0,
        start_time: hm(0, 0),
        end_time: hm(6, 0),
        active: true,
    })
    .unwrap();
    let config = Config {
        timezone: tz,
        ..Config::default()
    };
    let svc = AvailabilityService::with_clock(repo, config, FixedClock(utc(2026, 3, 1, 12, 0)))
        .unwrap();

    // 01:00 EST is 06:00 UTC; the hour runs into the 02:00 jump.
    let request = BookingRequest {
        service_id: HAIRCUT,
        provider_id: ALICE,
        date: date(2026, 3, 8),
        time: hm(1, 0),
    };
    assert!(matches!(svc.book(&request).unwrap(), BookingOutcome::Booked(_)));

    let slots = svc
        .get_available_slots(HAIRCUT, ALICE, "2026-03-08")
        .unwrap();
    assert_eq!(
        times(&slots),
        ["00:00", "03:00", "03:30", "04:00", "04:30", "05:00"]
    );
    assert!(!svc.is_slot_available(HAIRCUT, ALICE, "2026-03-08", "01:30").unwrap());
}

#[test]
fn booked_appointment_covers_buffers() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));
    let outcome = svc
        .book(&BookingRequest {
            service_id: COLORING,
            provider_id: ALICE,
            date: date(2026, 3, 4),
            time: hm(9, 0),
        })
        .unwrap();
    assert!(matches!(outcome, BookingOutcome::Booked(_)));

    let stored = svc.repository().appointments().unwrap();
    assert_eq!(stored[0].start_time, hm(9, 0));
    assert_eq!(stored[0].end_time, hm(10, 30));
    assert_eq!(stored[0].status, AppointmentStatus::Pending);

    // A plain hour-long haircut can start right when the buffered block ends.
    let slots = svc.get_available_slots(HAIRCUT, ALICE, "2026-03-04").unwrap();
    assert_eq!(times(&slots).first().map(String::as_str), Some("10:30"));
}

#[test]
fn off_grid_or_out_of_hours_booking_is_rejected() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));
    for time in [hm(9, 10), hm(16, 30), hm(7, 0)] {
        let outcome = svc
            .book(&BookingRequest {
                service_id: HAIRCUT,
                provider_id: ALICE,
                date: date(2026, 3, 4),
                time,
            })
            .unwrap();
        assert_eq!(outcome, BookingOutcome::SlotUnavailable, "{time} must be refused");
    }
    assert!(svc.repository().appointments().unwrap().is_empty());
}

#[test]
fn canceling_frees_the_slot_again() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));
    let request = BookingRequest {
        service_id: HAIRCUT,
        provider_id: ALICE,
        date: date(2026, 3, 4),
        time: hm(14, 0),
    };
    let BookingOutcome::Booked(id) = svc.book(&request).unwrap() else {
        panic!("first booking should succeed");
    };
    svc.repository()
        .set_status(id, AppointmentStatus::Canceled)
        .unwrap();

    assert!(matches!(svc.book(&request).unwrap(), BookingOutcome::Booked(_)));
}

#[test]
fn concurrent_bookings_for_one_slot_commit_once() {
    let svc = service_at(seeded_repo(), utc(2026, 3, 2, 8, 0));
    let request = BookingRequest {
        service_id: HAIRCUT,
        provider_id: ALICE,
        date: date(2026, 3, 4),
        time: hm(13, 0),
    };
    let booked = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                if let BookingOutcome::Booked(_) = svc.book(&request).unwrap() {
                    booked.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(booked.load(Ordering::SeqCst), 1);
    assert_eq!(svc.repository().appointments().unwrap().len(), 1);
}

#[test]
fn commit_if_refusal_leaves_tables_untouched() {
    let repo = seeded_repo();
    let refused = repo
        .commit_if(appointment(date(2026, 3, 4), hm(9, 0), hm(10, 0)), |_| false)
        .unwrap();
    assert_eq!(refused, None);
    assert!(repo.appointments().unwrap().is_empty());

    let seen = repo
        .commit_if(appointment(date(2026, 3, 4), hm(9, 0), hm(10, 0)), |booked| {
            booked.is_empty()
        })
        .unwrap();
    assert!(seen.is_some());
}
