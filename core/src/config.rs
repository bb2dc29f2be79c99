//! Shop-scoped capacity policy records and their resolution.
//!
//! RULE: fail-closed defaults live here and nowhere else. Call sites never
//! repeat the default literals; they resolve a full `ShopPolicy` first and
//! hand the pure engine functions a complete input set.

use crate::capacity::{generate_pairing_rules, validate_pairing_rules};
use crate::cert::CertLevel;
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};

/// Defaults used when a shop has not configured a beginner threshold.
pub const DEFAULT_MIN_CERT_LEVEL: CertLevel = CertLevel::Rescue;
pub const DEFAULT_MIN_DIVES_LOGGED: u32 = 20;

/// Defaults used when a shop has not configured per-staff caps.
pub const DEFAULT_MAX_EXPERIENCED_PER_STAFF: u32 = 5;
pub const DEFAULT_MAX_BEGINNERS_PER_STAFF: u32 = 3;

/// Policy deciding who counts as a beginner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeginnerThreshold {
    pub min_cert_level: CertLevel,
    pub min_dives_logged: u32,
}

/// The two endpoints of the pairing curve: an all-experienced trip and an
/// all-beginner trip, per staff member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CapacityConfig {
    pub max_experienced_per_staff: u32,
    pub max_beginners_per_staff: u32,
}

impl CapacityConfig {
    /// Reject zero caps at the editing surface, before they can reach
    /// pairing-table generation.
    pub fn validate(&self) -> ShopResult<()> {
        if self.max_experienced_per_staff == 0 {
            return Err(ShopError::InvalidConfig {
                reason: "max_experienced_per_staff must be at least 1".into(),
            });
        }
        if self.max_beginners_per_staff == 0 {
            return Err(ShopError::InvalidConfig {
                reason: "max_beginners_per_staff must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// One row of the pairing table: with `num_beginners` assigned to a staff
/// member, that staff member may supervise at most `max_experienced_allowed`
/// experienced divers on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRule {
    pub num_beginners: u32,
    pub max_experienced_allowed: u32,
}

/// Fully-resolved per-shop policy bundle consumed by the capacity engine.
#[derive(Debug, Clone)]
pub struct ShopPolicy {
    pub threshold: BeginnerThreshold,
    pub capacity: CapacityConfig,
    pub pairing_rules: Vec<PairingRule>,
}

impl ShopPolicy {
    /// Resolve possibly-missing shop configuration into a complete policy.
    ///
    /// Missing threshold or capacity rows fall back to the defaults above;
    /// an empty pairing table is generated from the resolved caps. A shop
    /// with no configuration at all therefore still gets a working,
    /// conservative policy rather than an error.
    pub fn resolve(
        threshold: Option<BeginnerThreshold>,
        capacity: Option<CapacityConfig>,
        pairing_rules: Vec<PairingRule>,
    ) -> ShopResult<ShopPolicy> {
        let threshold = threshold.unwrap_or(BeginnerThreshold {
            min_cert_level: DEFAULT_MIN_CERT_LEVEL,
            min_dives_logged: DEFAULT_MIN_DIVES_LOGGED,
        });
        let capacity = capacity.unwrap_or(CapacityConfig {
            max_experienced_per_staff: DEFAULT_MAX_EXPERIENCED_PER_STAFF,
            max_beginners_per_staff: DEFAULT_MAX_BEGINNERS_PER_STAFF,
        });
        capacity.validate()?;

        let pairing_rules = if pairing_rules.is_empty() {
            generate_pairing_rules(
                capacity.max_experienced_per_staff,
                capacity.max_beginners_per_staff,
            )?
        } else {
            let mut rules = pairing_rules;
            rules.sort_by_key(|r| r.num_beginners);
            rules
        };

        Ok(ShopPolicy {
            threshold,
            capacity,
            pairing_rules,
        })
    }

    /// Validate an admin-edited rule set before it is persisted.
    pub fn validate_rules(rules: &[PairingRule]) -> ShopResult<()> {
        validate_pairing_rules(rules)
    }
}
