//! Booking admission: the only path that writes bookings.
//!
//! RULES:
//!   - Every admission decision (create-confirmed, confirm-pending) runs
//!     inside one immediate transaction: recount roster, resolve policy,
//!     evaluate capacity, then write. Two concurrent requests cannot both
//!     see the same prior roster.
//!   - A full slot is a distinguishable `SlotFull` outcome, never a generic
//!     error and never a silent admit.
//!   - Pending-payment bookings hold no seat; confirmation re-runs the
//!     capacity check before flipping the status.

use crate::capacity::{classify_diver, evaluate_capacity, CapacityState, DiverClass};
use crate::cert::{meets_prerequisite, CertLevel};
use crate::error::{ShopError, ShopResult};
use crate::schedule::{week_start, TripSlotStatus};
use crate::staffing::available_staff;
use crate::store::ShopStore;
use crate::types::{BookingId, EntityId, TripSlotId};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    FunDive,
    Course,
}

impl BookingType {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingType::FunDive => "fun_dive",
            BookingType::Course => "course",
        }
    }

    pub fn parse(s: &str) -> Option<BookingType> {
        match s {
            "fun_dive" => Some(BookingType::FunDive),
            "course" => Some(BookingType::Course),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<BookingStatus> {
        match s {
            "pending_payment" => Some(BookingStatus::PendingPayment),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A persisted booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_id: BookingId,
    pub customer_id: EntityId,
    pub booking_type: BookingType,
    pub trip_slot_id: Option<TripSlotId>,
    pub shop_course_id: Option<EntityId>,
    pub course_start_date: Option<NaiveDate>,
    pub num_dives: Option<u32>,
    pub is_beginner: bool,
    pub status: BookingStatus,
    pub stripe_payment_id: Option<String>,
    pub amount_paid: Option<f64>,
    pub created_at: NaiveDate,
}

/// Diver identity and experience, as entered in the booking flow.
#[derive(Debug, Clone)]
pub struct DiverDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub cert_level: CertLevel,
    pub num_dives_logged: u32,
}

/// A fun-dive booking request against one trip slot.
#[derive(Debug, Clone)]
pub struct NewTripBooking {
    pub trip_slot_id: TripSlotId,
    pub diver: DiverDetails,
    pub num_dives: u32,
    /// Walk-ins are confirmed on the spot; online bookings sit in
    /// `pending_payment` until the payment webhook confirms them.
    pub walk_in: bool,
    pub booked_on: NaiveDate,
}

/// A course booking request.
#[derive(Debug, Clone)]
pub struct NewCourseBooking {
    pub shop_course_id: EntityId,
    pub diver: DiverDetails,
    pub start_date: NaiveDate,
    pub walk_in: bool,
    pub booked_on: NaiveDate,
}

/// What admission decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub booking_id: BookingId,
    pub class: DiverClass,
    pub status: BookingStatus,
    pub amount: f64,
    /// Capacity of the slot after this admission (fun dives only).
    pub capacity: Option<CapacityState>,
}

/// The booking-admission workflow over a `ShopStore`.
pub struct BookingService<'a> {
    store: &'a ShopStore,
}

impl<'a> BookingService<'a> {
    pub fn new(store: &'a ShopStore) -> Self {
        Self { store }
    }

    /// Book a diver onto a trip slot.
    pub fn book_trip(&self, req: &NewTripBooking) -> ShopResult<BookingOutcome> {
        self.store.begin_immediate()?;
        match self.book_trip_locked(req) {
            Ok(outcome) => {
                self.store.commit()?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = self.store.rollback();
                Err(e)
            }
        }
    }

    fn book_trip_locked(&self, req: &NewTripBooking) -> ShopResult<BookingOutcome> {
        let slot = self.store.get_trip_slot(&req.trip_slot_id)?;
        if slot.status != TripSlotStatus::Open {
            return Err(ShopError::SlotClosed {
                trip_slot_id: slot.trip_slot_id,
            });
        }

        let policy = self.store.shop_policy(&slot.shop_id)?;
        let class = classify_diver(
            req.diver.cert_level,
            req.diver.num_dives_logged,
            &policy.threshold,
        );

        let state = self.slot_capacity(&slot.shop_id, &slot.trip_slot_id, slot.date, &policy)?;
        let admissible = match class {
            DiverClass::Beginner => state.can_add_beginner,
            DiverClass::Experienced => state.can_add_experienced,
        };
        if !admissible {
            log::info!(
                "slot={} admission refused: {class} full ({}/{} beginners, {}/{} experienced)",
                slot.trip_slot_id,
                state.num_beginners,
                state.max_beginners,
                state.num_experienced,
                state.max_experienced,
            );
            return Err(ShopError::SlotFull {
                trip_slot_id: slot.trip_slot_id,
                class,
            });
        }

        let amount = self
            .store
            .fun_dive_price(&slot.shop_fun_dive_id, req.num_dives)?;
        let customer_id = self.upsert_diver(&req.diver, req.booked_on)?;

        let status = if req.walk_in {
            BookingStatus::Confirmed
        } else {
            BookingStatus::PendingPayment
        };
        let record = BookingRecord {
            booking_id: crate::types::new_entity_id(),
            customer_id,
            booking_type: BookingType::FunDive,
            trip_slot_id: Some(slot.trip_slot_id.clone()),
            shop_course_id: None,
            course_start_date: None,
            num_dives: Some(req.num_dives),
            is_beginner: class == DiverClass::Beginner,
            status,
            stripe_payment_id: None,
            amount_paid: Some(amount),
            created_at: req.booked_on,
        };
        self.store.insert_booking(&record)?;

        // Re-read so the outcome reflects this admission when it confirmed.
        let capacity =
            self.slot_capacity(&slot.shop_id, &slot.trip_slot_id, slot.date, &policy)?;
        log::info!(
            "slot={} booked {class} diver as {} (booking={})",
            slot.trip_slot_id,
            status.as_str(),
            record.booking_id,
        );

        Ok(BookingOutcome {
            booking_id: record.booking_id,
            class,
            status,
            amount,
            capacity: Some(capacity),
        })
    }

    /// Book a diver onto a course. Courses consume weekly staff headcount
    /// rather than trip-slot seats: every day of the course interval must
    /// still have at least one staff member free.
    pub fn book_course(&self, req: &NewCourseBooking) -> ShopResult<BookingOutcome> {
        self.store.begin_immediate()?;
        match self.book_course_locked(req) {
            Ok(outcome) => {
                self.store.commit()?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = self.store.rollback();
                Err(e)
            }
        }
    }

    fn book_course_locked(&self, req: &NewCourseBooking) -> ShopResult<BookingOutcome> {
        let (shop_id, duration_days, prerequisite, price) =
            self.store.shop_course_details(&req.shop_course_id)?;

        if !meets_prerequisite(req.diver.cert_level, prerequisite) {
            return Err(ShopError::PrerequisiteNotMet {
                cert: req.diver.cert_level.as_str().to_string(),
                required: prerequisite
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default(),
            });
        }

        self.check_course_staffing(&shop_id, req.start_date, duration_days)?;

        let policy = self.store.shop_policy(&shop_id)?;
        let class = classify_diver(
            req.diver.cert_level,
            req.diver.num_dives_logged,
            &policy.threshold,
        );
        let customer_id = self.upsert_diver(&req.diver, req.booked_on)?;

        let status = if req.walk_in {
            BookingStatus::Confirmed
        } else {
            BookingStatus::PendingPayment
        };
        let record = BookingRecord {
            booking_id: crate::types::new_entity_id(),
            customer_id,
            booking_type: BookingType::Course,
            trip_slot_id: None,
            shop_course_id: Some(req.shop_course_id.clone()),
            course_start_date: Some(req.start_date),
            num_dives: None,
            is_beginner: class == DiverClass::Beginner,
            status,
            stripe_payment_id: None,
            amount_paid: Some(price),
            created_at: req.booked_on,
        };
        self.store.insert_booking(&record)?;
        log::info!(
            "course={} booked starting {} as {} (booking={})",
            req.shop_course_id,
            req.start_date,
            status.as_str(),
            record.booking_id,
        );

        Ok(BookingOutcome {
            booking_id: record.booking_id,
            class,
            status,
            amount: price,
            capacity: None,
        })
    }

    /// Confirm a pending booking after payment. The authoritative capacity
    /// check happens here: a pending row held no seat, so admission is
    /// re-evaluated against the roster as of confirmation time.
    pub fn confirm_booking(
        &self,
        booking_id: &BookingId,
        stripe_payment_id: &str,
    ) -> ShopResult<BookingRecord> {
        self.store.begin_immediate()?;
        match self.confirm_booking_locked(booking_id, stripe_payment_id) {
            Ok(record) => {
                self.store.commit()?;
                Ok(record)
            }
            Err(e) => {
                let _ = self.store.rollback();
                Err(e)
            }
        }
    }

    fn confirm_booking_locked(
        &self,
        booking_id: &BookingId,
        stripe_payment_id: &str,
    ) -> ShopResult<BookingRecord> {
        let booking = self.store.get_booking(booking_id)?;
        if booking.status != BookingStatus::PendingPayment {
            return Err(ShopError::InvalidBookingState {
                booking_id: booking.booking_id,
                status: booking.status.as_str().to_string(),
                action: "confirm",
            });
        }

        match booking.booking_type {
            BookingType::FunDive => {
                let trip_slot_id =
                    booking
                        .trip_slot_id
                        .clone()
                        .ok_or_else(|| ShopError::InvalidBookingState {
                            booking_id: booking.booking_id.clone(),
                            status: "fun_dive without trip slot".into(),
                            action: "confirm",
                        })?;
                let slot = self.store.get_trip_slot(&trip_slot_id)?;
                if slot.status != TripSlotStatus::Open {
                    return Err(ShopError::SlotClosed {
                        trip_slot_id: slot.trip_slot_id,
                    });
                }
                let policy = self.store.shop_policy(&slot.shop_id)?;
                let state =
                    self.slot_capacity(&slot.shop_id, &slot.trip_slot_id, slot.date, &policy)?;
                let class = if booking.is_beginner {
                    DiverClass::Beginner
                } else {
                    DiverClass::Experienced
                };
                let admissible = match class {
                    DiverClass::Beginner => state.can_add_beginner,
                    DiverClass::Experienced => state.can_add_experienced,
                };
                if !admissible {
                    log::warn!(
                        "booking={} paid but slot={} filled while pending",
                        booking.booking_id,
                        slot.trip_slot_id,
                    );
                    return Err(ShopError::SlotFull {
                        trip_slot_id: slot.trip_slot_id,
                        class,
                    });
                }
            }
            BookingType::Course => {
                let shop_course_id =
                    booking
                        .shop_course_id
                        .clone()
                        .ok_or_else(|| ShopError::InvalidBookingState {
                            booking_id: booking.booking_id.clone(),
                            status: "course without shop_course_id".into(),
                            action: "confirm",
                        })?;
                let (shop_id, duration_days, _, _) =
                    self.store.shop_course_details(&shop_course_id)?;
                let start = booking.course_start_date.ok_or_else(|| {
                    ShopError::InvalidBookingState {
                        booking_id: booking.booking_id.clone(),
                        status: "course without start date".into(),
                        action: "confirm",
                    }
                })?;
                self.check_course_staffing(&shop_id, start, duration_days)?;
            }
        }

        self.store
            .set_booking_status(&booking.booking_id, BookingStatus::Confirmed)?;
        self.store
            .set_booking_payment(&booking.booking_id, stripe_payment_id)?;
        log::info!("booking={} confirmed", booking.booking_id);
        self.store.get_booking(booking_id)
    }

    /// Modify a fun-dive booking: move it to another slot and/or change the
    /// tank count. A move runs the same admission check as a fresh booking
    /// against the target slot, inside the same write-locking transaction,
    /// and re-prices from the target's fun dive.
    pub fn modify_booking(
        &self,
        booking_id: &BookingId,
        new_trip_slot_id: Option<&str>,
        new_num_dives: Option<u32>,
    ) -> ShopResult<BookingOutcome> {
        self.store.begin_immediate()?;
        match self.modify_booking_locked(booking_id, new_trip_slot_id, new_num_dives) {
            Ok(outcome) => {
                self.store.commit()?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = self.store.rollback();
                Err(e)
            }
        }
    }

    fn modify_booking_locked(
        &self,
        booking_id: &BookingId,
        new_trip_slot_id: Option<&str>,
        new_num_dives: Option<u32>,
    ) -> ShopResult<BookingOutcome> {
        let booking = self.store.get_booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(ShopError::InvalidBookingState {
                booking_id: booking.booking_id,
                status: booking.status.as_str().to_string(),
                action: "modify",
            });
        }
        if booking.booking_type != BookingType::FunDive {
            return Err(ShopError::InvalidBookingState {
                booking_id: booking.booking_id,
                status: "a course booking".into(),
                action: "modify",
            });
        }
        let current_slot_id =
            booking
                .trip_slot_id
                .clone()
                .ok_or_else(|| ShopError::InvalidBookingState {
                    booking_id: booking.booking_id.clone(),
                    status: "fun_dive without trip slot".into(),
                    action: "modify",
                })?;

        let target_slot_id = new_trip_slot_id.unwrap_or(&current_slot_id);
        let num_dives = new_num_dives.or(booking.num_dives).unwrap_or(1);

        let slot = self.store.get_trip_slot(target_slot_id)?;
        if slot.status != TripSlotStatus::Open {
            return Err(ShopError::SlotClosed {
                trip_slot_id: slot.trip_slot_id,
            });
        }

        let class = if booking.is_beginner {
            DiverClass::Beginner
        } else {
            DiverClass::Experienced
        };
        let policy = self.store.shop_policy(&slot.shop_id)?;

        // Moving onto another slot is an admission against that slot's
        // roster; the booking's current seat is on the old slot and does
        // not count here. Staying put only changes the tank count.
        if slot.trip_slot_id != current_slot_id {
            let state =
                self.slot_capacity(&slot.shop_id, &slot.trip_slot_id, slot.date, &policy)?;
            let admissible = match class {
                DiverClass::Beginner => state.can_add_beginner,
                DiverClass::Experienced => state.can_add_experienced,
            };
            if !admissible {
                log::info!(
                    "booking={} move refused: slot={} full for {class}",
                    booking.booking_id,
                    slot.trip_slot_id,
                );
                return Err(ShopError::SlotFull {
                    trip_slot_id: slot.trip_slot_id,
                    class,
                });
            }
        }

        let amount = self
            .store
            .fun_dive_price(&slot.shop_fun_dive_id, num_dives)?;
        self.store
            .update_booking_trip(&booking.booking_id, &slot.trip_slot_id, num_dives, amount)?;
        log::info!(
            "booking={} modified: slot={} num_dives={num_dives}",
            booking.booking_id,
            slot.trip_slot_id,
        );

        let capacity =
            self.slot_capacity(&slot.shop_id, &slot.trip_slot_id, slot.date, &policy)?;
        Ok(BookingOutcome {
            booking_id: booking.booking_id,
            class,
            status: booking.status,
            amount,
            capacity: Some(capacity),
        })
    }

    /// Cancel a booking. Roster counts are derived from confirmed rows, so
    /// freeing the seat needs no further bookkeeping.
    pub fn cancel_booking(&self, booking_id: &BookingId) -> ShopResult<BookingRecord> {
        let booking = self.store.get_booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(ShopError::InvalidBookingState {
                booking_id: booking.booking_id,
                status: booking.status.as_str().to_string(),
                action: "cancel",
            });
        }
        self.store
            .set_booking_status(&booking.booking_id, BookingStatus::Cancelled)?;
        log::info!("booking={} cancelled", booking.booking_id);
        self.store.get_booking(booking_id)
    }

    // ── Internals ──────────────────────────────────────────────

    fn upsert_diver(&self, diver: &DiverDetails, now: NaiveDate) -> ShopResult<EntityId> {
        self.store.upsert_customer(
            &diver.email,
            &diver.first_name,
            &diver.last_name,
            &diver.phone,
            diver.num_dives_logged,
            now,
        )
    }

    /// Capacity state for one slot from the current database state:
    /// weekly headcount minus course load, roster recounted from
    /// confirmed bookings, then the pure evaluator.
    fn slot_capacity(
        &self,
        shop_id: &str,
        trip_slot_id: &TripSlotId,
        date: NaiveDate,
        policy: &crate::config::ShopPolicy,
    ) -> ShopResult<CapacityState> {
        let total = self.store.weekly_staff(shop_id, week_start(date))?;
        let loads = self.store.confirmed_course_loads(shop_id)?;
        let staff = available_staff(total, &loads, date);
        let (beginners, experienced) = self.store.roster_counts(trip_slot_id)?;
        Ok(evaluate_capacity(
            staff,
            beginners,
            experienced,
            policy.capacity.max_beginners_per_staff,
            &policy.pairing_rules,
        ))
    }

    /// Every day of `[start, start + duration_days - 1]` must have spare
    /// staff after existing confirmed courses are deducted.
    fn check_course_staffing(
        &self,
        shop_id: &str,
        start: NaiveDate,
        duration_days: u32,
    ) -> ShopResult<()> {
        let loads = self.store.confirmed_course_loads(shop_id)?;
        for offset in 0..u64::from(duration_days.max(1)) {
            let day = start + Days::new(offset);
            let total = self.store.weekly_staff(shop_id, week_start(day))?;
            if available_staff(total, &loads, day) == 0 {
                return Err(ShopError::NoStaffForCourse {
                    start_date: start,
                    duration_days,
                });
            }
        }
        Ok(())
    }
}
