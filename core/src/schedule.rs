//! Weekly schedule: recurring template slots, per-date overrides, and the
//! planner that turns them into concrete trip slots for one week.
//!
//! Planning is pure; `ShopStore::regenerate_week_slots` applies a plan.

use crate::types::{EntityId, ShopId, TripSlotId};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripDuration {
    HalfDay,
    FullDay,
}

impl TripDuration {
    pub fn as_str(self) -> &'static str {
        match self {
            TripDuration::HalfDay => "half_day",
            TripDuration::FullDay => "full_day",
        }
    }

    pub fn parse(s: &str) -> Option<TripDuration> {
        match s {
            "half_day" => Some(TripDuration::HalfDay),
            "full_day" => Some(TripDuration::FullDay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    FullDay,
}

impl TimeSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::FullDay => "full_day",
        }
    }

    pub fn parse(s: &str) -> Option<TimeSlot> {
        match s {
            "morning" => Some(TimeSlot::Morning),
            "afternoon" => Some(TimeSlot::Afternoon),
            "full_day" => Some(TimeSlot::FullDay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn from_date(date: NaiveDate) -> DayOfWeek {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }

    pub fn parse(s: &str) -> Option<DayOfWeek> {
        match s {
            "mon" => Some(DayOfWeek::Mon),
            "tue" => Some(DayOfWeek::Tue),
            "wed" => Some(DayOfWeek::Wed),
            "thu" => Some(DayOfWeek::Thu),
            "fri" => Some(DayOfWeek::Fri),
            "sat" => Some(DayOfWeek::Sat),
            "sun" => Some(DayOfWeek::Sun),
            _ => None,
        }
    }
}

/// Monday of the week containing `date`. Weekly staff availability and slot
/// generation are both keyed by this.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date - Days::new(back)
}

/// A recurring schedule entry: "every Tuesday morning, house reef, half day".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleTemplateSlot {
    pub template_slot_id: EntityId,
    pub shop_id: ShopId,
    pub day_of_week: DayOfWeek,
    pub shop_fun_dive_id: EntityId,
    pub trip_duration: TripDuration,
    pub time_slot: TimeSlot,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    Add,
    Remove,
}

/// A one-off deviation from the template for a specific date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleOverride {
    pub override_id: EntityId,
    pub shop_id: ShopId,
    pub date: NaiveDate,
    pub action: OverrideAction,
    pub shop_fun_dive_id: EntityId,
    pub trip_duration: TripDuration,
    pub time_slot: TimeSlot,
}

/// A planned (not yet persisted) trip slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTripSlot {
    pub shop_id: ShopId,
    pub date: NaiveDate,
    pub shop_fun_dive_id: EntityId,
    pub trip_duration: TripDuration,
    pub time_slot: TimeSlot,
}

/// A persisted trip slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSlot {
    pub trip_slot_id: TripSlotId,
    pub shop_id: ShopId,
    pub date: NaiveDate,
    pub shop_fun_dive_id: EntityId,
    pub trip_duration: TripDuration,
    pub time_slot: TimeSlot,
    pub status: TripSlotStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripSlotStatus {
    Open,
    Cancelled,
}

impl TripSlotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TripSlotStatus::Open => "open",
            TripSlotStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<TripSlotStatus> {
        match s {
            "open" => Some(TripSlotStatus::Open),
            "cancelled" => Some(TripSlotStatus::Cancelled),
            _ => None,
        }
    }
}

/// Plan one week of trip slots from the recurring templates plus that week's
/// overrides.
///
/// For each day Monday..Sunday: active templates matching the weekday, minus
/// `remove` overrides for that date and fun dive, plus `add` overrides for
/// that date. Inactive templates never produce slots.
pub fn plan_week_slots(
    templates: &[ScheduleTemplateSlot],
    overrides: &[WeeklyScheduleOverride],
    week_start_date: NaiveDate,
) -> Vec<NewTripSlot> {
    let mut slots = Vec::new();

    for offset in 0..7u64 {
        let date = week_start_date + Days::new(offset);
        let dow = DayOfWeek::from_date(date);

        let day_overrides: Vec<&WeeklyScheduleOverride> =
            overrides.iter().filter(|o| o.date == date).collect();
        let removed: Vec<&str> = day_overrides
            .iter()
            .filter(|o| o.action == OverrideAction::Remove)
            .map(|o| o.shop_fun_dive_id.as_str())
            .collect();

        for tmpl in templates {
            if !tmpl.active || tmpl.day_of_week != dow {
                continue;
            }
            if removed.contains(&tmpl.shop_fun_dive_id.as_str()) {
                continue;
            }
            slots.push(NewTripSlot {
                shop_id: tmpl.shop_id.clone(),
                date,
                shop_fun_dive_id: tmpl.shop_fun_dive_id.clone(),
                trip_duration: tmpl.trip_duration,
                time_slot: tmpl.time_slot,
            });
        }

        for ovr in day_overrides
            .iter()
            .filter(|o| o.action == OverrideAction::Add)
        {
            slots.push(NewTripSlot {
                shop_id: ovr.shop_id.clone(),
                date,
                shop_fun_dive_id: ovr.shop_fun_dive_id.clone(),
                trip_duration: ovr.trip_duration,
                time_slot: ovr.time_slot,
            });
        }
    }

    slots
}
