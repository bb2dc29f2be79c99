//! Store methods for the dive catalog: locations, fun dives, course types,
//! shop courses.

use super::ShopStore;
use crate::cert::CertLevel;
use crate::error::{ShopError, ShopResult};
use crate::types::{EntityId, ShopId};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiveLocation {
    pub dive_location_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub max_depth_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopFunDive {
    pub shop_fun_dive_id: EntityId,
    pub shop_id: ShopId,
    pub dive_location_id: EntityId,
    pub price_1_tank: f64,
    pub price_2_tank: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseType {
    pub course_type_id: EntityId,
    pub name: String,
    pub duration_days: u32,
    pub prerequisite_cert_level: Option<CertLevel>,
    pub max_students_per_instructor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopCourse {
    pub shop_course_id: EntityId,
    pub shop_id: ShopId,
    pub course_type_id: EntityId,
    pub price: f64,
    pub active: bool,
}

impl ShopStore {
    pub fn insert_dive_location(&self, loc: &DiveLocation) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO dive_location (dive_location_id, name, description, max_depth_m)
             VALUES (?1, ?2, ?3, ?4)",
            params![loc.dive_location_id, loc.name, loc.description, loc.max_depth_m],
        )?;
        Ok(())
    }

    pub fn insert_fun_dive(&self, dive: &ShopFunDive) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO shop_fun_dive
                (shop_fun_dive_id, shop_id, dive_location_id, price_1_tank, price_2_tank, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                dive.shop_fun_dive_id,
                dive.shop_id,
                dive.dive_location_id,
                dive.price_1_tank,
                dive.price_2_tank,
                if dive.active { 1 } else { 0 },
            ],
        )?;
        Ok(())
    }

    /// Price of a fun dive for the chosen tank count.
    pub fn fun_dive_price(&self, shop_fun_dive_id: &str, num_dives: u32) -> ShopResult<f64> {
        let (one, two): (f64, f64) = self
            .conn
            .query_row(
                "SELECT price_1_tank, price_2_tank FROM shop_fun_dive
                 WHERE shop_fun_dive_id = ?1",
                params![shop_fun_dive_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| ShopError::NotFound {
                entity: "shop_fun_dive",
                id: shop_fun_dive_id.to_string(),
            })?;
        Ok(if num_dives >= 2 { two } else { one })
    }

    pub fn insert_course_type(&self, ct: &CourseType) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO course_type
                (course_type_id, name, duration_days, prerequisite_cert_level,
                 max_students_per_instructor)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ct.course_type_id,
                ct.name,
                ct.duration_days,
                ct.prerequisite_cert_level.map(|c| c.as_str()),
                ct.max_students_per_instructor,
            ],
        )?;
        Ok(())
    }

    pub fn insert_shop_course(&self, course: &ShopCourse) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO shop_course (shop_course_id, shop_id, course_type_id, price, active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                course.shop_course_id,
                course.shop_id,
                course.course_type_id,
                course.price,
                if course.active { 1 } else { 0 },
            ],
        )?;
        Ok(())
    }

    /// Shop, duration, prerequisite and price for one shop course.
    pub fn shop_course_details(
        &self,
        shop_course_id: &str,
    ) -> ShopResult<(ShopId, u32, Option<CertLevel>, f64)> {
        let row: Option<(String, i64, Option<String>, f64)> = self
            .conn
            .query_row(
                "SELECT sc.shop_id, ct.duration_days, ct.prerequisite_cert_level, sc.price
                 FROM shop_course sc
                 JOIN course_type ct ON sc.course_type_id = ct.course_type_id
                 WHERE sc.shop_course_id = ?1",
                params![shop_course_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let (shop_id, duration, prereq, price) =
            row.ok_or_else(|| ShopError::NotFound {
                entity: "shop_course",
                id: shop_course_id.to_string(),
            })?;

        let prerequisite = match prereq {
            Some(level) => Some(CertLevel::parse(&level).ok_or_else(|| {
                ShopError::InvalidConfig {
                    reason: format!("unknown cert level '{level}' in course_type"),
                }
            })?),
            None => None,
        };

        Ok((shop_id, duration.max(0) as u32, prerequisite, price))
    }
}
