//! Availability listing: every open slot in a date range with its capacity
//! verdict attached, for the customer-facing trip picker.

use crate::capacity::{evaluate_capacity, CapacityState};
use crate::error::ShopResult;
use crate::schedule::{week_start, TripSlot};
use crate::staffing::available_staff;
use crate::store::ShopStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One listed trip: the slot plus its computed capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripAvailability {
    pub slot: TripSlot,
    pub capacity: CapacityState,
}

impl TripAvailability {
    /// Rendered as "Full" by the booking UI.
    pub fn is_full(&self) -> bool {
        self.capacity.is_full()
    }
}

/// List all open trip slots for a shop in `[from, to]`, each with its
/// capacity state.
///
/// Everything is read once up front — policy, course loads, and the weekly
/// headcount per distinct week — so every slot in the response is judged
/// against the same snapshot of staffing and bookings.
pub fn list_available_trips(
    store: &ShopStore,
    shop_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> ShopResult<Vec<TripAvailability>> {
    let slots = store.open_trip_slots(shop_id, from, to)?;
    let policy = store.shop_policy(shop_id)?;
    let loads = store.confirmed_course_loads(shop_id)?;

    let mut staff_by_week: HashMap<NaiveDate, u32> = HashMap::new();
    for slot in &slots {
        let ws = week_start(slot.date);
        if !staff_by_week.contains_key(&ws) {
            staff_by_week.insert(ws, store.weekly_staff(shop_id, ws)?);
        }
    }

    let mut trips = Vec::with_capacity(slots.len());
    for slot in slots {
        let total = *staff_by_week
            .get(&week_start(slot.date))
            .unwrap_or(&0);
        let staff = available_staff(total, &loads, slot.date);
        let (beginners, experienced) = store.roster_counts(&slot.trip_slot_id)?;
        let capacity = evaluate_capacity(
            staff,
            beginners,
            experienced,
            policy.capacity.max_beginners_per_staff,
            &policy.pairing_rules,
        );
        trips.push(TripAvailability { slot, capacity });
    }

    Ok(trips)
}
