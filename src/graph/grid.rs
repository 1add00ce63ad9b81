// Calendar grid: `weeks` columns x 7 weekday rows, last column holding the reference date.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{ActivityLevel, CalendarCell, DayRecord, RenderRequest, WeekStart};

/// Month labels closer than this many columns to the next one are dropped.
const MIN_LABEL_GAP_COLUMNS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLabel {
    pub column: u32,
    pub text: String,
}

/// Totals over the in-range cells, shown under the legend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridSummary {
    pub active_days: u32,
    /// Consecutive active days ending at the last in-range date.
    pub streak: u32,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGrid {
    pub weeks: u32,
    pub week_start: WeekStart,
    /// Date of column 0, row 0.
    pub origin: NaiveDate,
    /// Last date drawn as in range: min(reference date, today).
    pub last_in_range: NaiveDate,
    /// Column-major: cells[column * 7 + row].
    pub cells: Vec<CalendarCell>,
    pub month_labels: Vec<MonthLabel>,
    pub summary: GridSummary,
}

/// Dates covered by the grid: (origin, reference date). Also the store read window.
pub fn grid_window(request: &RenderRequest, week_start: WeekStart) -> (NaiveDate, NaiveDate) {
    let last_column = week_start.column_start(request.reference_date);
    let back = (request.weeks.max(1) as u64 - 1) * 7;
    let origin = last_column
        .checked_sub_days(Days::new(back))
        .unwrap_or(NaiveDate::MIN);
    (origin, request.reference_date)
}

pub fn build_grid(
    request: &RenderRequest,
    today: NaiveDate,
    week_start: WeekStart,
    thresholds: &[u32; 4],
    records: &[DayRecord],
) -> CalendarGrid {
    let weeks = request.weeks.max(1);
    let (origin, reference) = grid_window(request, week_start);
    let last_in_range = reference.min(today);
    let by_date: BTreeMap<NaiveDate, &DayRecord> = records.iter().map(|r| (r.date, r)).collect();

    let mut cells = Vec::with_capacity(weeks as usize * 7);
    for column in 0..weeks {
        for row in 0..7 {
            let offset = (column * 7 + row) as u64;
            let date = origin + Days::new(offset);
            let is_in_range = date <= last_in_range;
            let active_minutes = if is_in_range {
                by_date.get(&date).map_or(0, |r| r.active_minutes)
            } else {
                0
            };
            cells.push(CalendarCell {
                column,
                row,
                date,
                active_minutes,
                activity_level: ActivityLevel::from_minutes(active_minutes, thresholds),
                is_in_range,
            });
        }
    }

    let month_labels = month_labels(&cells, weeks, last_in_range);
    let summary = summarize(&cells);
    CalendarGrid {
        weeks,
        week_start,
        origin,
        last_in_range,
        cells,
        month_labels,
        summary,
    }
}

/// A label above every column holding the 1st of a month (up to the last in-range date),
/// plus the first column's month when there is room before the next label.
fn month_labels(cells: &[CalendarCell], weeks: u32, last_in_range: NaiveDate) -> Vec<MonthLabel> {
    let mut labels: Vec<MonthLabel> = cells
        .iter()
        .filter(|c| c.date.day() == 1 && c.date <= last_in_range)
        .map(|c| MonthLabel {
            column: c.column,
            text: c.date.format("%b").to_string(),
        })
        .collect();

    if let Some(first) = cells.first() {
        let next_column = labels.first().map_or(weeks, |l| l.column);
        if next_column >= MIN_LABEL_GAP_COLUMNS {
            labels.insert(
                0,
                MonthLabel {
                    column: 0,
                    text: first.date.format("%b").to_string(),
                },
            );
        }
    }
    labels
}

fn summarize(cells: &[CalendarCell]) -> GridSummary {
    let in_range = || cells.iter().filter(|c| c.is_in_range);
    let active_days = in_range().filter(|c| c.active_minutes > 0).count() as u32;
    let total_minutes = in_range().map(|c| c.active_minutes as u64).sum();

    // Cells are in date order; walk back from the last in-range day.
    let streak = in_range()
        .rev()
        .take_while(|c| c.active_minutes > 0)
        .count() as u32;

    GridSummary {
        active_days,
        streak,
        total_minutes,
    }
}
