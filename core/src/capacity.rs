//! The staff-capacity engine: diver classification, pairing-table
//! generation/lookup, and the per-slot capacity evaluation.
//!
//! RULES:
//!   - Everything in this module is pure and synchronous. No store access,
//!     no logging of state changes, no interior mutability.
//!   - Inputs arrive fully resolved (see `config::ShopPolicy`); missing
//!     configuration is the caller's problem and resolves fail-closed.
//!   - The evaluator is re-run against freshly recounted rosters on every
//!     admission check. It holds no state between calls.

use crate::config::{BeginnerThreshold, PairingRule};
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one diver relative to a shop's beginner threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiverClass {
    Beginner,
    Experienced,
}

impl fmt::Display for DiverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiverClass::Beginner => write!(f, "beginner"),
            DiverClass::Experienced => write!(f, "experienced"),
        }
    }
}

/// Classify a diver against the shop threshold.
///
/// Experienced if the cert rank meets the minimum OR the logged dive count
/// does — either condition alone is sufficient.
pub fn classify_diver(
    cert_level: crate::cert::CertLevel,
    dives_logged: u32,
    threshold: &BeginnerThreshold,
) -> DiverClass {
    let experienced = cert_level.rank() >= threshold.min_cert_level.rank()
        || dives_logged >= threshold.min_dives_logged;
    if experienced {
        DiverClass::Experienced
    } else {
        DiverClass::Beginner
    }
}

/// Generate the pairing table by linear interpolation between the two
/// per-staff caps:
///
///   max_experienced_allowed(k) = floor(max_exp * (1 - k / max_beg))
///
/// for k = 0..=max_beg. Row 0 is exactly `max_experienced_per_staff`; the
/// last row is 0. `max_beginners_per_staff = 0` would divide by zero and is
/// rejected as a configuration error.
pub fn generate_pairing_rules(
    max_experienced_per_staff: u32,
    max_beginners_per_staff: u32,
) -> ShopResult<Vec<PairingRule>> {
    if max_beginners_per_staff == 0 {
        return Err(ShopError::InvalidConfig {
            reason: "cannot generate pairing rules with max_beginners_per_staff = 0".into(),
        });
    }

    // floor(exp * (1 - k/beg)) == exp * (beg - k) / beg in integer math.
    let rules = (0..=max_beginners_per_staff)
        .map(|k| PairingRule {
            num_beginners: k,
            max_experienced_allowed: max_experienced_per_staff
                * (max_beginners_per_staff - k)
                / max_beginners_per_staff,
        })
        .collect();

    Ok(rules)
}

/// Validate an admin-edited pairing table.
///
/// Walking rows in increasing `num_beginners` order, every
/// `max_experienced_allowed` must be <= its predecessor's (adding beginners
/// never increases the experienced allowance). Duplicate keys are rejected
/// too. The error names the offending row and the row it violates, so the
/// editor can point at the exact cell.
pub fn validate_pairing_rules(rules: &[PairingRule]) -> ShopResult<()> {
    let mut sorted: Vec<&PairingRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.num_beginners);

    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.num_beginners == prev.num_beginners {
            return Err(ShopError::InvalidConfig {
                reason: format!(
                    "duplicate pairing rule for num_beginners = {}",
                    cur.num_beginners
                ),
            });
        }
        if cur.max_experienced_allowed > prev.max_experienced_allowed {
            return Err(ShopError::InvalidConfig {
                reason: format!(
                    "pairing rule for {} beginners allows {} experienced, \
                     which exceeds the {} allowed at {} beginners",
                    cur.num_beginners,
                    cur.max_experienced_allowed,
                    prev.max_experienced_allowed,
                    prev.num_beginners
                ),
            });
        }
    }

    Ok(())
}

/// Look up the per-staff experienced allowance for a given beginner load.
///
/// Exact match wins. Anything else — a load above the table's largest key,
/// or a hole strictly inside the table — resolves to 0. Holes saturating to
/// zero instead of interpolating is a deliberate, load-bearing convention;
/// `validate_pairing_rules` plus generation keep real tables dense.
pub fn lookup_max_experienced(rules: &[PairingRule], num_beginners: u32) -> u32 {
    rules
        .iter()
        .find(|r| r.num_beginners == num_beginners)
        .map(|r| r.max_experienced_allowed)
        .unwrap_or(0)
}

/// The admission verdict for one trip slot at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityState {
    pub available_staff: u32,
    pub num_beginners: u32,
    pub num_experienced: u32,
    pub max_beginners: u32,
    pub max_experienced: u32,
    pub can_add_beginner: bool,
    pub can_add_experienced: bool,
    pub spots_remaining_beginners: u32,
    pub spots_remaining_experienced: u32,
}

impl CapacityState {
    /// Neither class can be admitted. Display code renders this as "Full".
    pub fn is_full(&self) -> bool {
        !self.can_add_beginner && !self.can_add_experienced
    }

    fn zero(num_beginners: u32, num_experienced: u32) -> CapacityState {
        CapacityState {
            available_staff: 0,
            num_beginners,
            num_experienced,
            max_beginners: 0,
            max_experienced: 0,
            can_add_beginner: false,
            can_add_experienced: false,
            spots_remaining_beginners: 0,
            spots_remaining_experienced: 0,
        }
    }
}

/// Compute the capacity state for a trip slot.
///
/// Beginner capacity scales linearly with staff. Experienced capacity is
/// driven by the current beginner load per staff member, rounded up — the
/// busiest staff member's load sets the allowance for the whole slot. The
/// two `can_add_*` checks are independent and both evaluated against the
/// roster as it stands now.
pub fn evaluate_capacity(
    available_staff: u32,
    num_beginners: u32,
    num_experienced: u32,
    max_beginners_per_staff: u32,
    pairing_rules: &[PairingRule],
) -> CapacityState {
    // Hard floor: no staff, no trip. Not an error.
    if available_staff == 0 {
        return CapacityState::zero(num_beginners, num_experienced);
    }

    let max_beginners = max_beginners_per_staff * available_staff;

    let beginners_per_staff = num_beginners.div_ceil(available_staff);
    let max_exp_per_staff = lookup_max_experienced(pairing_rules, beginners_per_staff);
    let max_experienced = max_exp_per_staff * available_staff;

    CapacityState {
        available_staff,
        num_beginners,
        num_experienced,
        max_beginners,
        max_experienced,
        can_add_beginner: num_beginners + 1 <= max_beginners,
        can_add_experienced: num_experienced + 1 <= max_experienced,
        spots_remaining_beginners: max_beginners.saturating_sub(num_beginners),
        spots_remaining_experienced: max_experienced.saturating_sub(num_experienced),
    }
}
