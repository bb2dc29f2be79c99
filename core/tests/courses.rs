use chrono::NaiveDate;
use reefbook_core::booking::{
    BookingRecord, BookingService, BookingStatus, BookingType, DiverDetails, NewCourseBooking,
};
use reefbook_core::cert::CertLevel;
use reefbook_core::error::ShopError;
use reefbook_core::store::{CourseType, ShopCourse, ShopStore};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
}

/// Shop selling a 3-day advanced course (open-water prerequisite) with a
/// single staff member rostered for the week.
fn seed_shop(store: &ShopStore) {
    store.migrate().unwrap();
    store.insert_shop("shop-1", "Blue Reef Divers", "Tulum").unwrap();
    store
        .insert_course_type(&CourseType {
            course_type_id: "ct-aow".into(),
            name: "Advanced Open Water".into(),
            duration_days: 3,
            prerequisite_cert_level: Some(CertLevel::OpenWater),
            max_students_per_instructor: 4,
        })
        .unwrap();
    store
        .insert_shop_course(&ShopCourse {
            shop_course_id: "sc-aow".into(),
            shop_id: "shop-1".into(),
            course_type_id: "ct-aow".into(),
            price: 420.0,
            active: true,
        })
        .unwrap();
    store.set_weekly_staff("shop-1", monday(), 1).unwrap();
}

fn student(email: &str, cert: CertLevel) -> DiverDetails {
    DiverDetails {
        email: email.into(),
        first_name: "Robin".into(),
        last_name: "Finn".into(),
        phone: "".into(),
        cert_level: cert,
        num_dives_logged: 8,
    }
}

fn course_req(email: &str, cert: CertLevel, start: NaiveDate) -> NewCourseBooking {
    NewCourseBooking {
        shop_course_id: "sc-aow".into(),
        diver: student(email, cert),
        start_date: start,
        walk_in: true,
        booked_on: monday(),
    }
}

#[test]
fn course_booking_confirms_and_records_the_course_price() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    let outcome = service
        .book_course(&course_req("a@example.com", CertLevel::OpenWater, monday()))
        .unwrap();
    assert_eq!(outcome.status, BookingStatus::Confirmed);
    assert_eq!(outcome.amount, 420.0);
    // Course admissions carry no trip-slot capacity snapshot.
    assert!(outcome.capacity.is_none());
}

#[test]
fn missing_prerequisite_is_rejected() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    let err = service
        .book_course(&course_req("uncert@example.com", CertLevel::None, monday()))
        .unwrap_err();
    assert!(matches!(err, ShopError::PrerequisiteNotMet { .. }));
}

#[test]
fn confirmed_course_consumes_the_only_staff_member() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    service
        .book_course(&course_req("first@example.com", CertLevel::OpenWater, monday()))
        .unwrap();

    // Mon..Wed are now fully committed; a second course overlapping any of
    // those days has nobody left to teach it.
    let err = service
        .book_course(&course_req(
            "second@example.com",
            CertLevel::OpenWater,
            monday().succ_opt().unwrap(),
        ))
        .unwrap_err();
    assert!(matches!(err, ShopError::NoStaffForCourse { .. }));

    // Starting after the first course ends (Thursday) is fine.
    let thursday = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
    service
        .book_course(&course_req("second@example.com", CertLevel::OpenWater, thursday))
        .unwrap();
}

#[test]
fn pending_course_holds_no_staff_and_is_rechecked_on_confirm() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    let mut req = course_req("online@example.com", CertLevel::OpenWater, monday());
    req.walk_in = false;
    let pending = service.book_course(&req).unwrap();
    assert_eq!(pending.status, BookingStatus::PendingPayment);

    // A walk-in takes the instructor while payment is in flight.
    service
        .book_course(&course_req("walkin@example.com", CertLevel::OpenWater, monday()))
        .unwrap();

    let err = service
        .confirm_booking(&pending.booking_id, "pi_course")
        .unwrap_err();
    assert!(matches!(err, ShopError::NoStaffForCourse { .. }));
}

#[test]
fn course_spanning_a_week_boundary_checks_both_weeks() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    // Saturday start: days 2 and 3 fall in the following, unstaffed week.
    let saturday = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
    let err = service
        .book_course(&course_req("span@example.com", CertLevel::OpenWater, saturday))
        .unwrap_err();
    assert!(matches!(err, ShopError::NoStaffForCourse { .. }));

    let next_monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
    store.set_weekly_staff("shop-1", next_monday, 1).unwrap();
    service
        .book_course(&course_req("span@example.com", CertLevel::OpenWater, saturday))
        .unwrap();
}

#[test]
fn course_bookings_cannot_be_moved_between_slots() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    let outcome = service
        .book_course(&course_req("fixed@example.com", CertLevel::OpenWater, monday()))
        .unwrap();
    let err = service
        .modify_booking(&outcome.booking_id, Some("ts-anything"), None)
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidBookingState { .. }));
}

#[test]
fn confirming_a_course_row_without_a_course_id_is_an_invalid_state() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    let customer_id = store
        .upsert_customer("broken@example.com", "B", "Row", "", 0, monday())
        .unwrap();
    let record = BookingRecord {
        booking_id: "bk-broken".into(),
        customer_id,
        booking_type: BookingType::Course,
        trip_slot_id: None,
        shop_course_id: None,
        course_start_date: Some(monday()),
        num_dives: None,
        is_beginner: true,
        status: BookingStatus::PendingPayment,
        stripe_payment_id: None,
        amount_paid: None,
        created_at: monday(),
    };
    store.insert_booking(&record).unwrap();

    let err = service
        .confirm_booking(&record.booking_id, "pi_broken")
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidBookingState { .. }));
}

#[test]
fn course_in_an_unstaffed_week_is_rejected() {
    let store = ShopStore::in_memory().unwrap();
    seed_shop(&store);
    let service = BookingService::new(&store);

    // The following week has no headcount row at all.
    let next_monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
    let err = service
        .book_course(&course_req("next@example.com", CertLevel::OpenWater, next_monday))
        .unwrap_err();
    assert!(matches!(err, ShopError::NoStaffForCourse { .. }));
}
