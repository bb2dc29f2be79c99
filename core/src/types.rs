//! Shared primitive types used across the whole crate.

/// A stable, unique identifier for any entity (shops, slots, bookings, ...).
pub type EntityId = String;

/// Identifier of a dive shop. Every config entity is scoped to one.
pub type ShopId = String;

/// Identifier of a bookable trip slot.
pub type TripSlotId = String;

/// Identifier of a booking row.
pub type BookingId = String;

/// Mint a fresh v4 uuid for a new entity.
pub fn new_entity_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}
