use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Arc;
use std::thread;

use crate::error::AppError;
use crate::models::appointment::{AppointmentStatus, BookingRequest, StatusChangeRequest};
use crate::models::availability::{CalendarCheckRequest, CalendarSlotsQuery};
use crate::models::common::PaginationParams;
use crate::services::booking::{
    appointment_details, book_appointment, calendar_check, calendar_slots, change_status,
    generate_booking_number, list_stylist_appointments, validate_duration,
};
use crate::services::store::Repository;
use crate::tests::common::fixtures::{
    monday, now, saturday, settings, temp_store, time_off_day, utc, STYLIST_ID,
};

/// Booking service tests
#[cfg(test)]
mod booking_tests {
    use super::*;

    fn rfc3339(time: DateTime<Utc>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn booking(start: DateTime<Utc>, duration_minutes: Option<u32>) -> BookingRequest {
        BookingRequest {
            stylist_id: STYLIST_ID.to_string(),
            service_id: Some("cut".to_string()),
            customer_name: Some("Sam Rivera".to_string()),
            start: rfc3339(start),
            duration_minutes,
        }
    }

    fn status_change(status: AppointmentStatus, reason: Option<&str>) -> StatusChangeRequest {
        StatusChangeRequest {
            status,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_book_appointment_stores_pending_appointment() {
        let (_dir, store) = temp_store();

        let appointment =
            book_appointment(store.as_ref(), &settings(), &booking(utc(monday(), 10, 0), Some(30)), now())
                .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.duration_minutes, 30);
        assert_eq!(appointment.start, utc(monday(), 10, 0));
        assert!(appointment.booking_number.starts_with("APT-"));

        let stored = store.find_appointment_by_id(&appointment.id).unwrap();
        assert_eq!(stored, Some(appointment));
    }

    #[test]
    fn test_blank_customer_name_is_stored_as_absent() {
        let (_dir, store) = temp_store();
        let mut request = booking(utc(monday(), 10, 0), Some(30));
        request.customer_name = Some("  ".to_string());

        let appointment = book_appointment(store.as_ref(), &settings(), &request, now()).unwrap();

        assert_eq!(appointment.customer_name, None);
        let stored = store.find_appointment_by_id(&appointment.id).unwrap();
        assert_eq!(stored, Some(appointment));
    }

    #[test]
    fn test_duration_comes_from_service_when_not_given() {
        let (_dir, store) = temp_store();

        let appointment =
            book_appointment(store.as_ref(), &settings(), &booking(utc(monday(), 10, 0), None), now())
                .unwrap();

        assert_eq!(appointment.duration_minutes, 60);
    }

    #[test]
    fn test_overlapping_booking_is_rejected() {
        let (_dir, store) = temp_store();
        let settings = settings();

        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 0), Some(60)), now())
            .unwrap();

        let err =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 30), Some(30)), now())
                .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Back-to-back is fine without a booking buffer
        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 11, 0), Some(30)), now())
            .unwrap();
    }

    #[test]
    fn test_booking_buffer_keeps_gap_between_appointments() {
        let (_dir, store) = temp_store();
        let mut settings = settings();
        settings.booking_buffer_minutes = 15;

        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 0), Some(60)), now())
            .unwrap();

        let err =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 11, 0), Some(30)), now())
                .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_other_stylists_do_not_block() {
        let (_dir, store) = temp_store();

        book_appointment(store.as_ref(), &settings(), &booking(utc(monday(), 10, 0), Some(60)), now())
            .unwrap();

        let mut other = booking(utc(monday(), 10, 0), Some(60));
        other.stylist_id = "stylist-2".to_string();
        book_appointment(store.as_ref(), &settings(), &other, now()).unwrap();
    }

    #[test]
    fn test_concurrent_bookings_for_one_slot_have_a_single_winner() {
        let (_dir, store) = temp_store();
        let repo: Arc<dyn Repository> = store.clone();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    book_appointment(
                        repo.as_ref(),
                        &settings(),
                        &booking(utc(monday(), 14, 0), Some(60)),
                        now(),
                    )
                    .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|booked| *booked)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_rejects_times_the_stylist_cannot_take() {
        let (_dir, store) = temp_store();
        let settings = settings();

        let past = book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 0), Some(30)), utc(monday(), 11, 0));
        assert!(matches!(past, Err(AppError::Validation(_))));

        let weekend =
            book_appointment(store.as_ref(), &settings, &booking(utc(saturday(), 10, 0), Some(30)), now());
        assert!(matches!(weekend, Err(AppError::Conflict(_))));

        let vacation =
            book_appointment(store.as_ref(), &settings, &booking(utc(time_off_day(), 10, 0), Some(30)), now());
        assert!(matches!(vacation, Err(AppError::Conflict(_))));

        let lunch =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 12, 30), Some(30)), now());
        assert!(matches!(lunch, Err(AppError::Conflict(_))));

        let after_hours =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 17, 0), Some(30)), now());
        assert!(matches!(after_hours, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_rejects_malformed_requests() {
        let (_dir, store) = temp_store();
        let settings = settings();

        let mut bad_time = booking(utc(monday(), 10, 0), Some(30));
        bad_time.start = "next tuesday".to_string();
        assert!(matches!(
            book_appointment(store.as_ref(), &settings, &bad_time, now()),
            Err(AppError::Validation(_))
        ));

        let mut no_stylist = booking(utc(monday(), 10, 0), Some(30));
        no_stylist.stylist_id = " ".to_string();
        assert!(matches!(
            book_appointment(store.as_ref(), &settings, &no_stylist, now()),
            Err(AppError::Validation(_))
        ));

        let mut unknown = booking(utc(monday(), 10, 0), Some(30));
        unknown.stylist_id = "nobody".to_string();
        assert!(matches!(
            book_appointment(store.as_ref(), &settings, &unknown, now()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_validate_duration_bounds() {
        assert!(validate_duration(15).is_ok());
        assert!(validate_duration(240).is_ok());
        assert!(validate_duration(0).is_err());
        assert!(validate_duration(50).is_err());
        assert!(validate_duration(255).is_err());
    }

    #[test]
    fn test_booking_number_format() {
        let number = generate_booking_number(now());
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "APT");
        assert_eq!(parts[1], now().timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_status_transitions_are_recorded() {
        let (_dir, store) = temp_store();
        let appointment =
            book_appointment(store.as_ref(), &settings(), &booking(utc(monday(), 10, 0), Some(30)), now())
                .unwrap();

        let (confirmed, change) = change_status(
            store.as_ref(),
            &appointment.id,
            &status_change(AppointmentStatus::Confirmed, Some("Customer confirmed by phone")),
            now() + Duration::hours(1),
        )
        .unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(change.previous_status, AppointmentStatus::Pending);

        change_status(
            store.as_ref(),
            &appointment.id,
            &status_change(AppointmentStatus::Completed, None),
            now() + Duration::hours(2),
        )
        .unwrap();

        let details = appointment_details(store.as_ref(), &appointment.id).unwrap();
        assert_eq!(details.appointment.status, AppointmentStatus::Completed);
        assert_eq!(details.end, utc(monday(), 10, 30));
        assert_eq!(details.status_history.len(), 2);
        assert_eq!(details.status_history[0].reason, "Customer confirmed by phone");
        assert_eq!(details.status_history[1].reason, "No reason provided");
        assert_eq!(details.status_history[1].status, AppointmentStatus::Completed);
    }

    #[test]
    fn test_terminal_status_cannot_change() {
        let (_dir, store) = temp_store();
        let appointment =
            book_appointment(store.as_ref(), &settings(), &booking(utc(monday(), 10, 0), Some(30)), now())
                .unwrap();

        change_status(
            store.as_ref(),
            &appointment.id,
            &status_change(AppointmentStatus::Cancelled, Some("Customer request")),
            now(),
        )
        .unwrap();

        let err = change_status(
            store.as_ref(),
            &appointment.id,
            &status_change(AppointmentStatus::Confirmed, None),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let skipped = change_status(
            store.as_ref(),
            "missing",
            &status_change(AppointmentStatus::Confirmed, None),
            now(),
        )
        .unwrap_err();
        assert!(matches!(skipped, AppError::NotFound(_)));
    }

    #[test]
    fn test_cancelling_frees_the_slot() {
        let (_dir, store) = temp_store();
        let settings = settings();
        let first =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 15, 0), Some(60)), now())
                .unwrap();

        change_status(
            store.as_ref(),
            &first.id,
            &status_change(AppointmentStatus::Cancelled, None),
            now(),
        )
        .unwrap();

        let second =
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 15, 0), Some(60)), now())
                .unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_list_appointments_paginates_in_start_order() {
        let (_dir, store) = temp_store();
        let settings = settings();
        for hour in [15, 9, 11] {
            book_appointment(store.as_ref(), &settings, &booking(utc(monday(), hour, 0), Some(30)), now())
                .unwrap();
        }

        let first_page = list_stylist_appointments(
            store.as_ref(),
            &settings,
            STYLIST_ID,
            "2035-04-02",
            &PaginationParams {
                page: 1,
                page_size: 2,
            },
        )
        .unwrap();
        assert_eq!(first_page.total_count, 3);
        assert_eq!(first_page.appointments.len(), 2);
        assert_eq!(first_page.appointments[0].start, utc(monday(), 9, 0));
        assert_eq!(first_page.appointments[1].start, utc(monday(), 11, 0));

        let second_page = list_stylist_appointments(
            store.as_ref(),
            &settings,
            STYLIST_ID,
            "2035-04-02",
            &PaginationParams {
                page: 2,
                page_size: 2,
            },
        )
        .unwrap();
        assert_eq!(second_page.appointments.len(), 1);
        assert_eq!(second_page.appointments[0].start, utc(monday(), 15, 0));

        let unknown = list_stylist_appointments(
            store.as_ref(),
            &settings,
            "nobody",
            "2035-04-02",
            &PaginationParams {
                page: 1,
                page_size: 20,
            },
        );
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_appointments_with_huge_page_is_empty() {
        let (_dir, store) = temp_store();
        let settings = settings();
        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 9, 0), Some(30)), now())
            .unwrap();

        let list = list_stylist_appointments(
            store.as_ref(),
            &settings,
            STYLIST_ID,
            "2035-04-02",
            &PaginationParams {
                page: usize::MAX,
                page_size: usize::MAX,
            },
        )
        .unwrap();

        assert_eq!(list.total_count, 1);
        assert_eq!(list.page, usize::MAX);
        assert_eq!(list.page_size, 100);
        assert!(list.appointments.is_empty());
    }

    #[test]
    fn test_calendar_check_applies_buffer_and_business_hours() {
        let (_dir, store) = temp_store();
        let settings = settings();
        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 30), Some(60)), now())
            .unwrap();

        let check = |start: DateTime<Utc>, request_time: DateTime<Utc>| {
            calendar_check(
                store.as_ref(),
                &settings,
                &CalendarCheckRequest {
                    date: rfc3339(start),
                    duration: 60,
                    stylist_id: None,
                },
                request_time,
            )
            .unwrap()
        };

        // Ends exactly where the 15 minute buffer begins
        let clear = check(utc(monday(), 9, 15), now());
        assert!(clear.available);
        assert!(clear.business_hours);
        assert!(clear.conflicts.is_empty());

        let inside_buffer = check(utc(monday(), 9, 30), now());
        assert!(!inside_buffer.available);
        assert_eq!(inside_buffer.conflicts.len(), 1);

        let after = check(utc(monday(), 11, 30), now());
        assert!(!after.available);

        let weekend = check(utc(saturday(), 10, 0), now());
        assert!(!weekend.business_hours);
        assert!(!weekend.available);

        let evening = check(utc(monday(), 18, 0), now());
        assert!(!evening.business_hours);

        let past = check(utc(monday(), 14, 0), utc(monday(), 15, 0));
        assert!(!past.is_future);
        assert!(!past.available);
    }

    #[test]
    fn test_calendar_check_can_target_one_stylist() {
        let (_dir, store) = temp_store();
        let settings = settings();
        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 0), Some(60)), now())
            .unwrap();

        let other = calendar_check(
            store.as_ref(),
            &settings,
            &CalendarCheckRequest {
                date: rfc3339(utc(monday(), 10, 0)),
                duration: 60,
                stylist_id: Some("stylist-2".to_string()),
            },
            now(),
        )
        .unwrap();
        assert!(other.available);

        let bad = calendar_check(
            store.as_ref(),
            &settings,
            &CalendarCheckRequest {
                date: "tomorrow".to_string(),
                duration: 60,
                stylist_id: None,
            },
            now(),
        );
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    fn slots_query(date: &str, stylist_id: Option<&str>) -> CalendarSlotsQuery {
        CalendarSlotsQuery {
            date: Some(date.to_string()),
            stylist_id: stylist_id.map(str::to_string),
        }
    }

    #[test]
    fn test_calendar_slots_keep_an_hour_from_existing_starts() {
        let (_dir, store) = temp_store();
        let settings = settings();
        book_appointment(store.as_ref(), &settings, &booking(utc(monday(), 10, 30), Some(60)), now())
            .unwrap();

        let slots = calendar_slots(store.as_ref(), &settings, &slots_query("2035-04-02", None), now())
            .unwrap();

        assert_eq!(slots.date, "2035-04-02");
        assert_eq!(slots.business_hours.start, settings.business_hours.open);
        assert_eq!(slots.business_hours.end, settings.business_hours.close);
        // 09:00 through 17:30 minus 10:00, 10:30 and 11:00
        assert_eq!(slots.available_slots.len(), 15);
        assert_eq!(slots.available_slots[0], utc(monday(), 9, 0));
        assert!(slots.available_slots.contains(&utc(monday(), 9, 30)));
        assert!(!slots.available_slots.contains(&utc(monday(), 10, 0)));
        assert!(!slots.available_slots.contains(&utc(monday(), 11, 0)));
        assert!(slots.available_slots.contains(&utc(monday(), 11, 30)));
        assert_eq!(slots.available_slots.last(), Some(&utc(monday(), 17, 30)));

        let other_stylist = calendar_slots(
            store.as_ref(),
            &settings,
            &slots_query("2035-04-02", Some("stylist-2")),
            now(),
        )
        .unwrap();
        assert_eq!(other_stylist.available_slots.len(), 18);
    }

    #[test]
    fn test_calendar_slots_skip_past_times_and_closed_days() {
        let (_dir, store) = temp_store();
        let settings = settings();

        let later = calendar_slots(
            store.as_ref(),
            &settings,
            &slots_query("2035-04-02", None),
            utc(monday(), 17, 0),
        )
        .unwrap();
        assert_eq!(later.available_slots, vec![utc(monday(), 17, 30)]);

        let weekend = calendar_slots(store.as_ref(), &settings, &slots_query("2035-04-07", None), now())
            .unwrap();
        assert!(weekend.available_slots.is_empty());

        let missing = calendar_slots(store.as_ref(), &settings, &CalendarSlotsQuery::default(), now());
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let malformed =
            calendar_slots(store.as_ref(), &settings, &slots_query("04/02/2035", None), now());
        assert!(matches!(malformed, Err(AppError::Validation(_))));
    }
}
