//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database. Services call store
//! methods — they never execute SQL directly.
//!
//! Admission-critical call sequences (read roster, evaluate, write booking)
//! run between `begin_immediate()` and `commit()`, which takes SQLite's
//! write lock up front and serializes concurrent admissions.

use crate::booking::{BookingRecord, BookingStatus, BookingType};
use crate::error::{ShopError, ShopResult};
use crate::types::EntityId;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

mod catalog;
mod policy;
mod schedule;

pub use catalog::{CourseType, DiveLocation, ShopCourse, ShopFunDive};

pub struct ShopStore {
    conn: Connection,
}

impl ShopStore {
    pub fn open(path: &str) -> ShopResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("db={path} opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ShopResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ShopResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_capacity.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_schedule.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_bookings.sql"))?;
        Ok(())
    }

    // ── Transactions ───────────────────────────────────────────

    /// Begin a write-locking transaction. All reads and writes until
    /// `commit()` observe one consistent snapshot, and no other connection
    /// can interleave an admission.
    pub fn begin_immediate(&self) -> ShopResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    pub fn commit(&self) -> ShopResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> ShopResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    // ── Shop ───────────────────────────────────────────────────

    pub fn insert_shop(&self, shop_id: &str, name: &str, location: &str) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO shop (shop_id, name, location) VALUES (?1, ?2, ?3)",
            params![shop_id, name, location],
        )?;
        Ok(())
    }

    pub fn shop_exists(&self, shop_id: &str) -> ShopResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shop WHERE shop_id = ?1",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ── Staff ──────────────────────────────────────────────────

    pub fn insert_staff(
        &self,
        staff_id: &str,
        shop_id: &str,
        name: &str,
        role: &str,
    ) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO staff (staff_id, shop_id, name, role, active) VALUES (?1, ?2, ?3, ?4, 1)",
            params![staff_id, shop_id, name, role],
        )?;
        Ok(())
    }

    pub fn active_staff_count(&self, shop_id: &str) -> ShopResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM staff WHERE shop_id = ?1 AND active = 1",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Customer ───────────────────────────────────────────────

    /// Insert or update a customer by email. Returns the customer id.
    /// Repeat bookers keep their id; details and dive count are refreshed.
    pub fn upsert_customer(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: &str,
        num_dives_logged: u32,
        now: NaiveDate,
    ) -> ShopResult<EntityId> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT customer_id FROM customer WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(customer_id) => {
                self.conn.execute(
                    "UPDATE customer
                     SET first_name = ?1, last_name = ?2, phone = ?3, num_dives_logged = ?4
                     WHERE customer_id = ?5",
                    params![first_name, last_name, phone, num_dives_logged, customer_id],
                )?;
                Ok(customer_id)
            }
            None => {
                let customer_id = crate::types::new_entity_id();
                self.conn.execute(
                    "INSERT INTO customer
                     (customer_id, email, first_name, last_name, phone, num_dives_logged, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        customer_id,
                        email,
                        first_name,
                        last_name,
                        phone,
                        num_dives_logged,
                        now.to_string(),
                    ],
                )?;
                Ok(customer_id)
            }
        }
    }

    pub fn customer_dives_logged(&self, customer_id: &str) -> ShopResult<u32> {
        let dives: i64 = self.conn.query_row(
            "SELECT num_dives_logged FROM customer WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )?;
        Ok(dives.max(0) as u32)
    }

    // ── Bookings ───────────────────────────────────────────────

    pub fn insert_booking(&self, b: &BookingRecord) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO booking (
                booking_id, customer_id, booking_type, trip_slot_id, shop_course_id,
                course_start_date, num_dives, is_beginner, status,
                stripe_payment_id, amount_paid, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                b.booking_id,
                b.customer_id,
                b.booking_type.as_str(),
                b.trip_slot_id,
                b.shop_course_id,
                b.course_start_date.map(|d| d.to_string()),
                b.num_dives,
                if b.is_beginner { 1 } else { 0 },
                b.status.as_str(),
                b.stripe_payment_id,
                b.amount_paid,
                b.created_at.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn get_booking(&self, booking_id: &str) -> ShopResult<BookingRecord> {
        self.conn
            .query_row(
                "SELECT booking_id, customer_id, booking_type, trip_slot_id, shop_course_id,
                        course_start_date, num_dives, is_beginner, status,
                        stripe_payment_id, amount_paid, created_at
                 FROM booking WHERE booking_id = ?1",
                params![booking_id],
                booking_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ShopError::NotFound {
                entity: "booking",
                id: booking_id.to_string(),
            })
    }

    pub fn set_booking_status(&self, booking_id: &str, status: BookingStatus) -> ShopResult<()> {
        self.conn.execute(
            "UPDATE booking SET status = ?1 WHERE booking_id = ?2",
            params![status.as_str(), booking_id],
        )?;
        Ok(())
    }

    pub fn set_booking_payment(
        &self,
        booking_id: &str,
        stripe_payment_id: &str,
    ) -> ShopResult<()> {
        self.conn.execute(
            "UPDATE booking SET stripe_payment_id = ?1 WHERE booking_id = ?2",
            params![stripe_payment_id, booking_id],
        )?;
        Ok(())
    }

    /// Move a fun-dive booking onto a (possibly different) slot with a new
    /// tank count and price. Admission against the target slot happens in
    /// the service layer, before this runs.
    pub fn update_booking_trip(
        &self,
        booking_id: &str,
        trip_slot_id: &str,
        num_dives: u32,
        amount_paid: f64,
    ) -> ShopResult<()> {
        self.conn.execute(
            "UPDATE booking SET trip_slot_id = ?1, num_dives = ?2, amount_paid = ?3
             WHERE booking_id = ?4",
            params![trip_slot_id, num_dives, amount_paid, booking_id],
        )?;
        Ok(())
    }

    /// Roster composition for one trip slot, recounted from confirmed
    /// bookings. Never cached; this is the drift-proof source of truth.
    pub fn roster_counts(&self, trip_slot_id: &str) -> ShopResult<(u32, u32)> {
        let (beginners, experienced): (i64, i64) = self.conn.query_row(
            "SELECT
             COALESCE(SUM(CASE WHEN is_beginner = 1 THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN is_beginner = 0 THEN 1 ELSE 0 END), 0)
             FROM booking
             WHERE trip_slot_id = ?1 AND status = 'confirmed'",
            params![trip_slot_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((beginners as u32, experienced as u32))
    }

    /// Confirmed course bookings for a shop, joined to their course
    /// durations. Input to the staff-availability deduction.
    pub fn confirmed_course_loads(&self, shop_id: &str) -> ShopResult<Vec<crate::staffing::CourseLoad>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.course_start_date, ct.duration_days
             FROM booking b
             JOIN shop_course sc ON b.shop_course_id = sc.shop_course_id
             JOIN course_type ct ON sc.course_type_id = ct.course_type_id
             WHERE sc.shop_id = ?1
               AND b.booking_type = 'course'
               AND b.status = 'confirmed'
               AND b.course_start_date IS NOT NULL",
        )?;
        let loads = stmt
            .query_map(params![shop_id], |row| {
                let start: String = row.get(0)?;
                let duration: i64 = row.get(1)?;
                Ok((start, duration))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        loads
            .into_iter()
            .map(|(start, duration)| {
                let start_date = start.parse::<NaiveDate>().map_err(|e| {
                    ShopError::Other(anyhow::anyhow!("bad course_start_date '{start}': {e}"))
                })?;
                Ok(crate::staffing::CourseLoad {
                    start_date,
                    duration_days: duration.max(0) as u32,
                })
            })
            .collect()
    }

    pub fn booking_count(&self, trip_slot_id: &str, status: &str) -> ShopResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM booking WHERE trip_slot_id = ?1 AND status = ?2",
            params![trip_slot_id, status],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn booking_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingRecord> {
    let booking_type: String = row.get(2)?;
    let status: String = row.get(8)?;
    let course_start: Option<String> = row.get(5)?;
    let created: String = row.get(11)?;
    Ok(BookingRecord {
        booking_id: row.get(0)?,
        customer_id: row.get(1)?,
        booking_type: BookingType::parse(&booking_type).unwrap_or(BookingType::FunDive),
        trip_slot_id: row.get(3)?,
        shop_course_id: row.get(4)?,
        course_start_date: course_start.and_then(|s| s.parse().ok()),
        num_dives: row.get(6)?,
        is_beginner: row.get::<_, i32>(7)? != 0,
        status: BookingStatus::parse(&status).unwrap_or(BookingStatus::Cancelled),
        stripe_payment_id: row.get(9)?,
        amount_paid: row.get(10)?,
        created_at: created.parse().unwrap_or_default(),
    })
}
