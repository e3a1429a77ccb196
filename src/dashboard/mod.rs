//! Dashboard module
//!
//! Heatmap, weekly/monthly summaries and the week calendar, computed from the
//! task log.

pub mod calendar;
pub mod summary;

pub use calendar::{calendar_week, calendar_week_start, CalendarWeek};
pub use summary::{
    heatmap, intensity, monthly_summary, week_start, weekly_summary, CategoryMinutes, DayStats,
    HeatmapDay, MonthlySummary, WeeklySummary,
};
