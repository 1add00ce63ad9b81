// Domain models: day records, per-minute statistics, render request/grid types.

mod activity;
mod graph;

pub use activity::{DayRecord, MinuteStat};
pub use graph::{ActivityLevel, CalendarCell, RenderRequest, Theme, WeekStart};
