//! Store methods for schedule templates, overrides, and trip slots.

use super::ShopStore;
use crate::error::{ShopError, ShopResult};
use crate::schedule::{
    DayOfWeek, NewTripSlot, OverrideAction, ScheduleTemplateSlot, TimeSlot, TripDuration,
    TripSlot, TripSlotStatus, WeeklyScheduleOverride,
};
use chrono::{Days, NaiveDate};
use rusqlite::{params, OptionalExtension};

impl ShopStore {
    // ── Templates ──────────────────────────────────────────────

    pub fn insert_template_slot(&self, tmpl: &ScheduleTemplateSlot) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO schedule_template_slot
                (template_slot_id, shop_id, day_of_week, shop_fun_dive_id,
                 trip_duration, time_slot, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tmpl.template_slot_id,
                tmpl.shop_id,
                tmpl.day_of_week.as_str(),
                tmpl.shop_fun_dive_id,
                tmpl.trip_duration.as_str(),
                tmpl.time_slot.as_str(),
                if tmpl.active { 1 } else { 0 },
            ],
        )?;
        Ok(())
    }

    pub fn active_template_slots(&self, shop_id: &str) -> ShopResult<Vec<ScheduleTemplateSlot>> {
        let mut stmt = self.conn.prepare(
            "SELECT template_slot_id, shop_id, day_of_week, shop_fun_dive_id,
                    trip_duration, time_slot, active
             FROM schedule_template_slot
             WHERE shop_id = ?1 AND active = 1",
        )?;
        let rows = stmt
            .query_map(params![shop_id], |row| {
                let dow: String = row.get(2)?;
                let duration: String = row.get(4)?;
                let time: String = row.get(5)?;
                Ok(ScheduleTemplateSlot {
                    template_slot_id: row.get(0)?,
                    shop_id: row.get(1)?,
                    day_of_week: DayOfWeek::parse(&dow).unwrap_or(DayOfWeek::Mon),
                    shop_fun_dive_id: row.get(3)?,
                    trip_duration: TripDuration::parse(&duration)
                        .unwrap_or(TripDuration::HalfDay),
                    time_slot: TimeSlot::parse(&time).unwrap_or(TimeSlot::Morning),
                    active: row.get::<_, i32>(6)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Overrides ──────────────────────────────────────────────

    pub fn insert_schedule_override(&self, ovr: &WeeklyScheduleOverride) -> ShopResult<()> {
        let action = match ovr.action {
            OverrideAction::Add => "add",
            OverrideAction::Remove => "remove",
        };
        self.conn.execute(
            "INSERT INTO weekly_schedule_override
                (override_id, shop_id, date, action, shop_fun_dive_id, trip_duration, time_slot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                ovr.override_id,
                ovr.shop_id,
                ovr.date.to_string(),
                action,
                ovr.shop_fun_dive_id,
                ovr.trip_duration.as_str(),
                ovr.time_slot.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn overrides_for_week(
        &self,
        shop_id: &str,
        week_start_date: NaiveDate,
    ) -> ShopResult<Vec<WeeklyScheduleOverride>> {
        let week_end = week_start_date + Days::new(6);
        let mut stmt = self.conn.prepare(
            "SELECT override_id, shop_id, date, action, shop_fun_dive_id,
                    trip_duration, time_slot
             FROM weekly_schedule_override
             WHERE shop_id = ?1 AND date >= ?2 AND date <= ?3",
        )?;
        let rows = stmt
            .query_map(
                params![shop_id, week_start_date.to_string(), week_end.to_string()],
                |row| {
                    let date: String = row.get(2)?;
                    let action: String = row.get(3)?;
                    let duration: String = row.get(5)?;
                    let time: String = row.get(6)?;
                    Ok(WeeklyScheduleOverride {
                        override_id: row.get(0)?,
                        shop_id: row.get(1)?,
                        date: date.parse().unwrap_or_default(),
                        action: if action == "add" {
                            OverrideAction::Add
                        } else {
                            OverrideAction::Remove
                        },
                        shop_fun_dive_id: row.get(4)?,
                        trip_duration: TripDuration::parse(&duration)
                            .unwrap_or(TripDuration::HalfDay),
                        time_slot: TimeSlot::parse(&time).unwrap_or(TimeSlot::Morning),
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Trip slots ─────────────────────────────────────────────

    pub fn get_trip_slot(&self, trip_slot_id: &str) -> ShopResult<TripSlot> {
        self.conn
            .query_row(
                "SELECT trip_slot_id, shop_id, date, shop_fun_dive_id,
                        trip_duration, time_slot, status
                 FROM trip_slot WHERE trip_slot_id = ?1",
                params![trip_slot_id],
                trip_slot_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ShopError::NotFound {
                entity: "trip_slot",
                id: trip_slot_id.to_string(),
            })
    }

    pub fn open_trip_slots(
        &self,
        shop_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ShopResult<Vec<TripSlot>> {
        let mut stmt = self.conn.prepare(
            "SELECT trip_slot_id, shop_id, date, shop_fun_dive_id,
                    trip_duration, time_slot, status
             FROM trip_slot
             WHERE shop_id = ?1 AND status = 'open' AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, time_slot ASC",
        )?;
        let rows = stmt
            .query_map(
                params![shop_id, from.to_string(), to.to_string()],
                trip_slot_row_mapper,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn cancel_trip_slot(&self, trip_slot_id: &str) -> ShopResult<()> {
        self.conn.execute(
            "UPDATE trip_slot SET status = 'cancelled' WHERE trip_slot_id = ?1",
            params![trip_slot_id],
        )?;
        Ok(())
    }

    /// Apply a week plan: delete the week's still-open slots (cancelled ones
    /// are history and stay put), then insert the planned slots. Runs in one
    /// transaction so a listing never sees a half-regenerated week.
    pub fn regenerate_week_slots(
        &self,
        shop_id: &str,
        week_start_date: NaiveDate,
        plan: &[NewTripSlot],
    ) -> ShopResult<usize> {
        let week_end = week_start_date + Days::new(6);

        self.begin_immediate()?;
        let result = (|| -> ShopResult<usize> {
            self.conn.execute(
                "DELETE FROM trip_slot
                 WHERE shop_id = ?1 AND status = 'open' AND date >= ?2 AND date <= ?3",
                params![shop_id, week_start_date.to_string(), week_end.to_string()],
            )?;
            for slot in plan {
                self.conn.execute(
                    "INSERT INTO trip_slot
                        (trip_slot_id, shop_id, date, shop_fun_dive_id,
                         trip_duration, time_slot, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open')",
                    params![
                        crate::types::new_entity_id(),
                        slot.shop_id,
                        slot.date.to_string(),
                        slot.shop_fun_dive_id,
                        slot.trip_duration.as_str(),
                        slot.time_slot.as_str(),
                    ],
                )?;
            }
            Ok(plan.len())
        })();

        match result {
            Ok(n) => {
                self.commit()?;
                log::info!(
                    "shop={shop_id} regenerated week {week_start_date}: {n} slots"
                );
                Ok(n)
            }
            Err(e) => {
                let _ = self.rollback();
                Err(e)
            }
        }
    }
}

fn trip_slot_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<TripSlot> {
    let date: String = row.get(2)?;
    let duration: String = row.get(4)?;
    let time: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(TripSlot {
        trip_slot_id: row.get(0)?,
        shop_id: row.get(1)?,
        date: date.parse().unwrap_or_default(),
        shop_fun_dive_id: row.get(3)?,
        trip_duration: TripDuration::parse(&duration).unwrap_or(TripDuration::HalfDay),
        time_slot: TimeSlot::parse(&time).unwrap_or(TimeSlot::Morning),
        status: TripSlotStatus::parse(&status).unwrap_or(TripSlotStatus::Cancelled),
    })
}
