use chrono::NaiveDate;
use reefbook_core::booking::{BookingService, BookingStatus, DiverDetails, NewTripBooking};
use reefbook_core::capacity::{generate_pairing_rules, DiverClass};
use reefbook_core::cert::CertLevel;
use reefbook_core::config::{BeginnerThreshold, CapacityConfig};
use reefbook_core::error::ShopError;
use reefbook_core::schedule::{NewTripSlot, TimeSlot, TripDuration};
use reefbook_core::store::{DiveLocation, ShopFunDive, ShopStore};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

/// Shop with 2 staff this week, caps 5 experienced / 3 beginners per staff,
/// rescue-or-20-dives threshold, generated pairing table, slots on Monday
/// and Tuesday. Returns the Monday slot id.
fn seed_shop(store: &ShopStore) -> String {
    store.migrate().unwrap();
    store.insert_shop("shop-1", "Blue Reef Divers", "Tulum").unwrap();
    store
        .insert_dive_location(&DiveLocation {
            dive_location_id: "loc-1".into(),
            name: "House Reef".into(),
            description: None,
            max_depth_m: Some(18.0),
        })
        .unwrap();
    store
        .insert_fun_dive(&ShopFunDive {
            shop_fun_dive_id: "fd-1".into(),
            shop_id: "shop-1".into(),
            dive_location_id: "loc-1".into(),
            price_1_tank: 60.0,
            price_2_tank: 95.0,
            active: true,
        })
        .unwrap();
    store
        .set_beginner_threshold(
            "shop-1",
            &BeginnerThreshold {
                min_cert_level: CertLevel::Rescue,
                min_dives_logged: 20,
            },
        )
        .unwrap();
    store
        .set_capacity_config(
            "shop-1",
            &CapacityConfig {
                max_experienced_per_staff: 5,
                max_beginners_per_staff: 3,
            },
        )
        .unwrap();
    store
        .replace_pairing_rules("shop-1", &generate_pairing_rules(5, 3).unwrap())
        .unwrap();
    store.set_weekly_staff("shop-1", monday(), 2).unwrap();

    let plan = vec![
        NewTripSlot {
            shop_id: "shop-1".into(),
            date: monday(),
            shop_fun_dive_id: "fd-1".into(),
            trip_duration: TripDuration::HalfDay,
            time_slot: TimeSlot::Morning,
        },
        NewTripSlot {
            shop_id: "shop-1".into(),
            date: tuesday(),
            shop_fun_dive_id: "fd-1".into(),
            trip_duration: TripDuration::HalfDay,
            time_slot: TimeSlot::Morning,
        },
    ];
    store.regenerate_week_slots("shop-1", monday(), &plan).unwrap();
    store.open_trip_slots("shop-1", monday(), monday()).unwrap()[0]
        .trip_slot_id
        .clone()
}

fn tuesday_slot(store: &ShopStore) -> String {
    store.open_trip_slots("shop-1", tuesday(), tuesday()).unwrap()[0]
        .trip_slot_id
        .clone()
}

fn beginner(email: &str) -> DiverDetails {
    DiverDetails {
        email: email.into(),
        first_name: "Sam".into(),
        last_name: "Reef".into(),
        phone: "".into(),
        cert_level: CertLevel::OpenWater,
        num_dives_logged: 4,
    }
}

fn experienced(email: &str) -> DiverDetails {
    DiverDetails {
        email: email.into(),
        first_name: "Alex".into(),
        last_name: "Wall".into(),
        phone: "".into(),
        cert_level: CertLevel::Divemaster,
        num_dives_logged: 300,
    }
}

fn walk_in(slot: &str, diver: DiverDetails) -> NewTripBooking {
    NewTripBooking {
        trip_slot_id: slot.into(),
        diver,
        num_dives: 1,
        walk_in: true,
        booked_on: monday(),
    }
}

#[test]
fn beginners_admit_up_to_the_linear_cap_then_slot_full() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    // 3 beginners per staff x 2 staff = 6 seats.
    for i in 0..6 {
        let outcome = service
            .book_trip(&walk_in(&slot, beginner(&format!("b{i}@example.com"))))
            .unwrap();
        assert_eq!(outcome.class, DiverClass::Beginner);
        assert_eq!(outcome.status, BookingStatus::Confirmed);
    }

    let err = service
        .book_trip(&walk_in(&slot, beginner("b7@example.com")))
        .unwrap_err();
    assert!(
        matches!(err, ShopError::SlotFull { class: DiverClass::Beginner, .. }),
        "expected SlotFull for beginner, got {err}"
    );
}

#[test]
fn beginner_load_shrinks_the_experienced_allowance() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    // 5 beginners on 2 staff: ceil(5/2) = 3 per staff, the saturated end of
    // the 5/3 pairing curve. No experienced diver can join.
    for i in 0..5 {
        service
            .book_trip(&walk_in(&slot, beginner(&format!("b{i}@example.com"))))
            .unwrap();
    }
    let err = service
        .book_trip(&walk_in(&slot, experienced("e1@example.com")))
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::SlotFull { class: DiverClass::Experienced, .. }
    ));

    // The last beginner seat is still open.
    let outcome = service
        .book_trip(&walk_in(&slot, beginner("b6@example.com")))
        .unwrap();
    assert_eq!(outcome.class, DiverClass::Beginner);
}

#[test]
fn dive_count_alone_classifies_experienced() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    // Advanced is below the rescue threshold, but 25 >= 20 logged dives.
    let diver = DiverDetails {
        email: "logs@example.com".into(),
        first_name: "Kai".into(),
        last_name: "Deep".into(),
        phone: "".into(),
        cert_level: CertLevel::Advanced,
        num_dives_logged: 25,
    };
    let outcome = service.book_trip(&walk_in(&slot, diver)).unwrap();
    assert_eq!(outcome.class, DiverClass::Experienced);
}

#[test]
fn pending_booking_holds_no_seat_until_confirmed() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let mut req = walk_in(&slot, experienced("online@example.com"));
    req.walk_in = false;
    let outcome = service.book_trip(&req).unwrap();
    assert_eq!(outcome.status, BookingStatus::PendingPayment);
    assert_eq!(store.roster_counts(&slot).unwrap(), (0, 0));

    let confirmed = service
        .confirm_booking(&outcome.booking_id, "pi_test_123")
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.stripe_payment_id.as_deref(), Some("pi_test_123"));
    assert_eq!(store.roster_counts(&slot).unwrap(), (0, 1));
}

#[test]
fn confirmation_recheck_rejects_a_slot_filled_while_pending() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let mut req = walk_in(&slot, beginner("slow-payer@example.com"));
    req.walk_in = false;
    let pending = service.book_trip(&req).unwrap();

    // Six walk-ins fill the beginner side while the payment is in flight.
    for i in 0..6 {
        service
            .book_trip(&walk_in(&slot, beginner(&format!("fast{i}@example.com"))))
            .unwrap();
    }

    let err = service
        .confirm_booking(&pending.booking_id, "pi_late")
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::SlotFull { class: DiverClass::Beginner, .. }
    ));
    // The booking is still pending, not silently confirmed.
    let record = store.get_booking(&pending.booking_id).unwrap();
    assert_eq!(record.status, BookingStatus::PendingPayment);
}

#[test]
fn cancellation_frees_the_seat() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let mut last = None;
    for i in 0..6 {
        last = Some(
            service
                .book_trip(&walk_in(&slot, beginner(&format!("b{i}@example.com"))))
                .unwrap(),
        );
    }
    assert!(service
        .book_trip(&walk_in(&slot, beginner("waitlist@example.com")))
        .is_err());

    service
        .cancel_booking(&last.unwrap().booking_id)
        .unwrap();

    // Roster is recounted from confirmed rows, so the seat is back.
    let outcome = service
        .book_trip(&walk_in(&slot, beginner("waitlist@example.com")))
        .unwrap();
    assert_eq!(outcome.status, BookingStatus::Confirmed);
}

#[test]
fn double_cancel_is_an_invalid_state_transition() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let outcome = service
        .book_trip(&walk_in(&slot, beginner("once@example.com")))
        .unwrap();
    service.cancel_booking(&outcome.booking_id).unwrap();
    let err = service.cancel_booking(&outcome.booking_id).unwrap_err();
    assert!(matches!(err, ShopError::InvalidBookingState { .. }));
}

#[test]
fn modification_moves_the_seat_and_reprices() {
    let store = ShopStore::in_memory().unwrap();
    let mon_slot = seed_shop(&store);
    let tue_slot = tuesday_slot(&store);
    let service = BookingService::new(&store);

    let outcome = service
        .book_trip(&walk_in(&mon_slot, experienced("mover@example.com")))
        .unwrap();
    assert_eq!(store.roster_counts(&mon_slot).unwrap(), (0, 1));

    // Move to Tuesday and switch to a two-tank day.
    let modified = service
        .modify_booking(&outcome.booking_id, Some(&tue_slot), Some(2))
        .unwrap();
    assert_eq!(modified.amount, 95.0);
    assert_eq!(store.roster_counts(&mon_slot).unwrap(), (0, 0));
    assert_eq!(store.roster_counts(&tue_slot).unwrap(), (0, 1));

    let record = store.get_booking(&outcome.booking_id).unwrap();
    assert_eq!(record.trip_slot_id.as_deref(), Some(tue_slot.as_str()));
    assert_eq!(record.num_dives, Some(2));
}

#[test]
fn modification_into_a_full_slot_is_rejected_and_the_row_stays() {
    let store = ShopStore::in_memory().unwrap();
    let mon_slot = seed_shop(&store);
    let tue_slot = tuesday_slot(&store);
    let service = BookingService::new(&store);

    // Fill Tuesday's beginner side (3 per staff x 2 staff).
    for i in 0..6 {
        service
            .book_trip(&walk_in(&tue_slot, beginner(&format!("tue{i}@example.com"))))
            .unwrap();
    }
    let outcome = service
        .book_trip(&walk_in(&mon_slot, beginner("mover@example.com")))
        .unwrap();

    let err = service
        .modify_booking(&outcome.booking_id, Some(&tue_slot), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::SlotFull { class: DiverClass::Beginner, .. }
    ));
    // The booking keeps its original seat.
    let record = store.get_booking(&outcome.booking_id).unwrap();
    assert_eq!(record.trip_slot_id.as_deref(), Some(mon_slot.as_str()));
    assert_eq!(store.roster_counts(&mon_slot).unwrap(), (1, 0));
}

#[test]
fn tank_count_change_in_place_needs_no_capacity_headroom() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    // Fill the beginner side completely, then bump one booking's tank count.
    let mut last = None;
    for i in 0..6 {
        last = Some(
            service
                .book_trip(&walk_in(&slot, beginner(&format!("b{i}@example.com"))))
                .unwrap(),
        );
    }
    let modified = service
        .modify_booking(&last.unwrap().booking_id, None, Some(2))
        .unwrap();
    assert_eq!(modified.amount, 95.0);
    assert_eq!(store.roster_counts(&slot).unwrap(), (6, 0));
}

#[test]
fn cancelled_booking_cannot_be_modified() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let outcome = service
        .book_trip(&walk_in(&slot, beginner("gone@example.com")))
        .unwrap();
    service.cancel_booking(&outcome.booking_id).unwrap();
    let err = service
        .modify_booking(&outcome.booking_id, None, Some(2))
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidBookingState { .. }));
}

#[test]
fn two_tank_booking_uses_the_two_tank_price() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    let mut req = walk_in(&slot, experienced("tanks@example.com"));
    req.num_dives = 2;
    let outcome = service.book_trip(&req).unwrap();
    assert_eq!(outcome.amount, 95.0);
}

#[test]
fn cancelled_slot_rejects_bookings() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    store.cancel_trip_slot(&slot).unwrap();
    let err = service
        .book_trip(&walk_in(&slot, beginner("late@example.com")))
        .unwrap_err();
    assert!(matches!(err, ShopError::SlotClosed { .. }));
}

#[test]
fn unstaffed_week_admits_nobody() {
    let store = ShopStore::in_memory().unwrap();
    let slot = seed_shop(&store);
    let service = BookingService::new(&store);

    store.set_weekly_staff("shop-1", monday(), 0).unwrap();
    let err = service
        .book_trip(&walk_in(&slot, experienced("ghost@example.com")))
        .unwrap_err();
    assert!(matches!(err, ShopError::SlotFull { .. }));
}
