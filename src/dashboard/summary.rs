//! Aggregations over the task log for the dashboard views

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::state::{Category, LogEntry};

/// One cell of the activity heatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub total_minutes: u32,
    pub avg_focus: f64,
    /// 0 (nothing logged) to 4 (long and focused)
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMinutes {
    pub category: Category,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub weekday: Weekday,
    pub date: NaiveDate,
    pub minutes: u32,
    pub avg_focus: f64,
    pub avg_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub total_minutes: u32,
    pub by_category: Vec<CategoryMinutes>,
    pub by_day: Vec<DayStats>,
    pub most_focused_day: Weekday,
    pub top_category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub most_focused_day: Option<NaiveDate>,
    pub days_logged: u32,
    pub days_in_month: u32,
}

fn entry_date(entry: &LogEntry) -> NaiveDate {
    entry.created_at.date_naive()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Minutes summed without wrapping
fn total_minutes<'a, I: Iterator<Item = &'a LogEntry>>(entries: I) -> u32 {
    entries.fold(0u32, |total, e| total.saturating_add(e.duration_minutes))
}

fn average<I: Iterator<Item = u8>>(values: I) -> f64 {
    let (sum, count) = values.fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Heatmap level for a day's total time and average focus
pub fn intensity(total_minutes: u32, avg_focus: f64) -> u8 {
    match total_minutes {
        0 => 0,
        1..=29 => 1,
        30..=89 => 2,
        _ if avg_focus >= 4.0 => 4,
        _ => 3,
    }
}

/// Per-day activity for the `days` days ending at `end`, oldest first
pub fn heatmap(entries: &[LogEntry], end: NaiveDate, days: u32) -> Vec<HeatmapDay> {
    let Some(first) = end.checked_sub_days(Days::new(u64::from(days.saturating_sub(1)))) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let day: Vec<&LogEntry> = entries.iter().filter(|e| entry_date(e) == date).collect();
            let minutes = total_minutes(day.iter().copied());
            let avg_focus = average(day.iter().map(|e| e.focus));
            HeatmapDay {
                date,
                total_minutes: minutes,
                avg_focus: round2(avg_focus),
                level: intensity(minutes, avg_focus),
            }
        })
        .collect()
}

/// Sunday of the week containing `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Days::new(u64::from(day.weekday().num_days_from_sunday()))
}

/// Summary of the Sunday-to-Saturday week containing `today`
pub fn weekly_summary(entries: &[LogEntry], today: NaiveDate) -> WeeklySummary {
    let start = week_start(today);
    let week: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| {
            let date = entry_date(e);
            date >= start && date < start + Days::new(7)
        })
        .collect();

    let by_category: Vec<CategoryMinutes> = Category::ALL
        .iter()
        .map(|&category| CategoryMinutes {
            category,
            minutes: total_minutes(week.iter().copied().filter(|e| e.category == category)),
        })
        .filter(|c| c.minutes > 0)
        .collect();

    let by_day: Vec<DayStats> = start
        .iter_days()
        .take(7)
        .map(|date| {
            let day: Vec<&&LogEntry> = week.iter().filter(|e| entry_date(e) == date).collect();
            DayStats {
                weekday: date.weekday(),
                date,
                minutes: total_minutes(day.iter().map(|e| **e)),
                avg_focus: round2(average(day.iter().map(|e| e.focus))),
                avg_value: round2(average(day.iter().map(|e| e.value.score()))),
            }
        })
        .collect();

    // Ties go to the earliest weekday
    let most_focused_day = by_day
        .iter()
        .fold(None::<&DayStats>, |best, day| match best {
            Some(b) if b.avg_focus >= day.avg_focus => Some(b),
            _ => Some(day),
        })
        .map_or(Weekday::Sun, |d| d.weekday);

    // Ties go to the later category
    let top_category = by_category
        .iter()
        .reduce(|a, b| if a.minutes > b.minutes { a } else { b })
        .map(|c| c.category);

    WeeklySummary {
        week_start: start,
        total_minutes: total_minutes(week.iter().copied()),
        by_category,
        by_day,
        most_focused_day,
        top_category,
    }
}

/// Summary of the calendar month containing `today`
pub fn monthly_summary(entries: &[LogEntry], today: NaiveDate) -> MonthlySummary {
    let mut focus_by_day: BTreeMap<NaiveDate, Vec<u8>> = BTreeMap::new();
    for entry in entries {
        let date = entry_date(entry);
        if date.year() == today.year() && date.month() == today.month() {
            focus_by_day.entry(date).or_default().push(entry.focus);
        }
    }

    let most_focused_day = focus_by_day
        .iter()
        .map(|(date, focus)| (*date, average(focus.iter().copied())))
        .fold(None::<(NaiveDate, f64)>, |best, day| match best {
            Some(b) if b.1 >= day.1 => Some(b),
            _ => Some(day),
        })
        .map(|(date, _)| date);

    MonthlySummary {
        year: today.year(),
        month: today.month(),
        most_focused_day,
        days_logged: u32::try_from(focus_by_day.len()).unwrap_or(u32::MAX),
        days_in_month: days_in_month(today),
    }
}

fn days_in_month(day: NaiveDate) -> u32 {
    let first = day.with_day(1).unwrap_or(day);
    let next = first.checked_add_months(chrono::Months::new(1)).unwrap_or(first);
    u32::try_from((next - first).num_days()).unwrap_or(0)
}
