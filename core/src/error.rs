use crate::types::TripSlotId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Trip slot '{trip_slot_id}' is full for {class} divers")]
    SlotFull {
        trip_slot_id: TripSlotId,
        class: crate::capacity::DiverClass,
    },

    #[error("Trip slot '{trip_slot_id}' is cancelled and cannot be booked")]
    SlotClosed { trip_slot_id: TripSlotId },

    #[error("Certification '{cert}' does not meet the course prerequisite '{required}'")]
    PrerequisiteNotMet { cert: String, required: String },

    #[error("No staff available for course starting {start_date} ({duration_days} day(s))")]
    NoStaffForCourse {
        start_date: chrono::NaiveDate,
        duration_days: u32,
    },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Booking '{booking_id}' is {status}, cannot {action}")]
    InvalidBookingState {
        booking_id: String,
        status: String,
        action: &'static str,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ShopResult<T> = Result<T, ShopError>;
