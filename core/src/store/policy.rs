//! Store methods for the shop-scoped capacity policy: beginner threshold,
//! per-staff caps, pairing rules, weekly staff headcount.

use super::ShopStore;
use crate::cert::CertLevel;
use crate::config::{BeginnerThreshold, CapacityConfig, PairingRule, ShopPolicy};
use crate::error::{ShopError, ShopResult};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl ShopStore {
    // ── Beginner threshold ─────────────────────────────────────

    pub fn set_beginner_threshold(
        &self,
        shop_id: &str,
        threshold: &BeginnerThreshold,
    ) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO beginner_threshold (shop_id, min_cert_level, min_dives_logged)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(shop_id) DO UPDATE SET
                min_cert_level = excluded.min_cert_level,
                min_dives_logged = excluded.min_dives_logged",
            params![
                shop_id,
                threshold.min_cert_level.as_str(),
                threshold.min_dives_logged,
            ],
        )?;
        Ok(())
    }

    pub fn beginner_threshold(&self, shop_id: &str) -> ShopResult<Option<BeginnerThreshold>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT min_cert_level, min_dives_logged
                 FROM beginner_threshold WHERE shop_id = ?1",
                params![shop_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((level, dives)) => {
                let min_cert_level =
                    CertLevel::parse(&level).ok_or_else(|| ShopError::InvalidConfig {
                        reason: format!("unknown cert level '{level}' in beginner_threshold"),
                    })?;
                Ok(Some(BeginnerThreshold {
                    min_cert_level,
                    min_dives_logged: dives.max(0) as u32,
                }))
            }
            None => Ok(None),
        }
    }

    // ── Capacity config ────────────────────────────────────────

    pub fn set_capacity_config(
        &self,
        shop_id: &str,
        config: &CapacityConfig,
    ) -> ShopResult<()> {
        config.validate()?;
        self.conn.execute(
            "INSERT INTO shop_capacity_config
                (shop_id, max_experienced_per_staff, max_beginners_per_staff)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(shop_id) DO UPDATE SET
                max_experienced_per_staff = excluded.max_experienced_per_staff,
                max_beginners_per_staff = excluded.max_beginners_per_staff",
            params![
                shop_id,
                config.max_experienced_per_staff,
                config.max_beginners_per_staff,
            ],
        )?;
        Ok(())
    }

    pub fn capacity_config(&self, shop_id: &str) -> ShopResult<Option<CapacityConfig>> {
        let row = self
            .conn
            .query_row(
                "SELECT max_experienced_per_staff, max_beginners_per_staff
                 FROM shop_capacity_config WHERE shop_id = ?1",
                params![shop_id],
                |row| {
                    Ok(CapacityConfig {
                        max_experienced_per_staff: row.get::<_, i64>(0)?.max(0) as u32,
                        max_beginners_per_staff: row.get::<_, i64>(1)?.max(0) as u32,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Pairing rules ──────────────────────────────────────────

    /// Replace the shop's pairing table. Validates first: a save with a
    /// non-monotonic or duplicated row never reaches the database.
    pub fn replace_pairing_rules(
        &self,
        shop_id: &str,
        rules: &[PairingRule],
    ) -> ShopResult<()> {
        ShopPolicy::validate_rules(rules)?;
        self.conn.execute(
            "DELETE FROM staff_pairing_rule WHERE shop_id = ?1",
            params![shop_id],
        )?;
        for rule in rules {
            self.conn.execute(
                "INSERT INTO staff_pairing_rule (shop_id, num_beginners, max_experienced_allowed)
                 VALUES (?1, ?2, ?3)",
                params![shop_id, rule.num_beginners, rule.max_experienced_allowed],
            )?;
        }
        log::info!("shop={shop_id} pairing table replaced ({} rows)", rules.len());
        Ok(())
    }

    pub fn pairing_rules(&self, shop_id: &str) -> ShopResult<Vec<PairingRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT num_beginners, max_experienced_allowed
             FROM staff_pairing_rule WHERE shop_id = ?1
             ORDER BY num_beginners ASC",
        )?;
        let rules = stmt
            .query_map(params![shop_id], |row| {
                Ok(PairingRule {
                    num_beginners: row.get::<_, i64>(0)?.max(0) as u32,
                    max_experienced_allowed: row.get::<_, i64>(1)?.max(0) as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Load and resolve the full policy bundle for a shop. Missing rows
    /// fall back to the fail-closed defaults in `config`.
    pub fn shop_policy(&self, shop_id: &str) -> ShopResult<ShopPolicy> {
        let threshold = self.beginner_threshold(shop_id)?;
        let capacity = self.capacity_config(shop_id)?;
        let rules = self.pairing_rules(shop_id)?;
        ShopPolicy::resolve(threshold, capacity, rules)
    }

    // ── Weekly staff availability ──────────────────────────────

    pub fn set_weekly_staff(
        &self,
        shop_id: &str,
        week_start_date: NaiveDate,
        total_staff_available: u32,
    ) -> ShopResult<()> {
        self.conn.execute(
            "INSERT INTO weekly_staff_availability
                (shop_id, week_start_date, total_staff_available)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(shop_id, week_start_date) DO UPDATE SET
                total_staff_available = excluded.total_staff_available",
            params![shop_id, week_start_date.to_string(), total_staff_available],
        )?;
        Ok(())
    }

    /// Weekly headcount, or 0 when unset — an unstaffed week admits nobody.
    pub fn weekly_staff(&self, shop_id: &str, week_start_date: NaiveDate) -> ShopResult<u32> {
        let staff: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_staff_available FROM weekly_staff_availability
                 WHERE shop_id = ?1 AND week_start_date = ?2",
                params![shop_id, week_start_date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(staff.unwrap_or(0).max(0) as u32)
    }
}
