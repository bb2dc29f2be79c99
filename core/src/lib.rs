//! reefbook-core: booking and operations core for a dive shop.
//!
//! The heart of the crate is the staff-capacity engine in [`capacity`]: a
//! pure, stateless calculator deciding how many beginner and experienced
//! divers a trip slot can take given available staff, per-staff caps, and
//! the beginner/experienced pairing table. Around it sit the configuration
//! layer ([`config`]), the weekly schedule ([`schedule`]), staff accounting
//! ([`staffing`]), the SQLite store ([`store`]), and the transactional
//! booking workflow ([`booking`]).

pub mod availability;
pub mod booking;
pub mod capacity;
pub mod cert;
pub mod config;
pub mod error;
pub mod schedule;
pub mod staffing;
pub mod store;
pub mod types;
