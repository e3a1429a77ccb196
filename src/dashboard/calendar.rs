//! Week calendar of scheduled tasks

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::state::LogEntry;

/// One Monday-to-Sunday page of the calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub week_start: NaiveDate,
    /// Last day shown, inclusive
    pub week_end: NaiveDate,
    pub previous_week: NaiveDate,
    pub next_week: NaiveDate,
    /// Entries starting within the week, earliest first
    pub entries: Vec<LogEntry>,
}

/// Monday of the calendar week containing `day`
pub fn calendar_week_start(day: NaiveDate) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_monday())))
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

/// Calendar page for the week containing `day`.
///
/// An entry is shown when its scheduled start falls in
/// `[monday 00:00, next monday 00:00)`; unscheduled entries are never shown.
/// Returns `None` for weeks at the edge of the representable date range.
pub fn calendar_week(entries: &[LogEntry], day: NaiveDate) -> Option<CalendarWeek> {
    let week_start = calendar_week_start(day)?;
    let next_week = week_start.checked_add_days(Days::new(7))?;
    let previous_week = week_start.checked_sub_days(Days::new(7))?;
    let week_end = week_start.checked_add_days(Days::new(6))?;

    let (from, until) = (midnight(week_start), midnight(next_week));
    let mut scheduled: Vec<LogEntry> = entries
        .iter()
        .filter(|e| e.start.is_some_and(|start| start >= from && start < until))
        .cloned()
        .collect();
    scheduled.sort_by_key(|e| e.start);

    Some(CalendarWeek {
        week_start,
        week_end,
        previous_week,
        next_week,
        entries: scheduled,
    })
}
