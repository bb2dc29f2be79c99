//! Staff availability for a specific trip date.
//!
//! A shop declares a weekly headcount; confirmed multi-day course bookings
//! consume one staff member for every day of their interval. Whatever is
//! left runs the day's fun-dive trips.

use chrono::{Days, NaiveDate};

/// A confirmed course booking's staffing footprint.
#[derive(Debug, Clone, Copy)]
pub struct CourseLoad {
    pub start_date: NaiveDate,
    pub duration_days: u32,
}

/// Does a course starting at `start` and running `duration_days` cover `date`?
/// The interval is inclusive: a 3-day course covers start, start+1, start+2.
pub fn course_covers(start: NaiveDate, duration_days: u32, date: NaiveDate) -> bool {
    if duration_days == 0 {
        return false;
    }
    let end = start + Days::new(u64::from(duration_days) - 1);
    date >= start && date <= end
}

/// Staff left over for trips on `date`: the weekly headcount minus one per
/// course in session that day, floored at 0.
pub fn available_staff(total_staff_for_week: u32, courses: &[CourseLoad], date: NaiveDate) -> u32 {
    let consumed = courses
        .iter()
        .filter(|c| course_covers(c.start_date, c.duration_days, date))
        .count() as u32;
    total_staff_for_week.saturating_sub(consumed)
}
