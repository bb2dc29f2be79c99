//! Certification levels and their comparison order.

use serde::{Deserialize, Serialize};

/// A diver's certification level as declared at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertLevel {
    None,
    OpenWater,
    Advanced,
    Rescue,
    Divemaster,
    Instructor,
    Other,
}

impl CertLevel {
    /// Comparison rank. `Other` deliberately shares a rank with `OpenWater`:
    /// an unrecognized agency card is treated as open-water equivalent.
    pub fn rank(self) -> u8 {
        match self {
            CertLevel::None       => 0,
            CertLevel::OpenWater  => 1,
            CertLevel::Other      => 1,
            CertLevel::Advanced   => 2,
            CertLevel::Rescue     => 3,
            CertLevel::Divemaster => 4,
            CertLevel::Instructor => 5,
        }
    }

    /// Stable snake_case name, matching the serde representation.
    /// Used for the TEXT columns in the store.
    pub fn as_str(self) -> &'static str {
        match self {
            CertLevel::None       => "none",
            CertLevel::OpenWater  => "open_water",
            CertLevel::Advanced   => "advanced",
            CertLevel::Rescue     => "rescue",
            CertLevel::Divemaster => "divemaster",
            CertLevel::Instructor => "instructor",
            CertLevel::Other      => "other",
        }
    }

    pub fn parse(s: &str) -> Option<CertLevel> {
        match s {
            "none"       => Some(CertLevel::None),
            "open_water" => Some(CertLevel::OpenWater),
            "advanced"   => Some(CertLevel::Advanced),
            "rescue"     => Some(CertLevel::Rescue),
            "divemaster" => Some(CertLevel::Divemaster),
            "instructor" => Some(CertLevel::Instructor),
            "other"      => Some(CertLevel::Other),
            _            => None,
        }
    }
}

/// Check a course prerequisite. No prerequisite always passes.
pub fn meets_prerequisite(cert: CertLevel, prerequisite: Option<CertLevel>) -> bool {
    match prerequisite {
        Some(required) => cert.rank() >= required.rank(),
        None => true,
    }
}
