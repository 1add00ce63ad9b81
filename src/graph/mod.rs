// Contribution-graph renderer: day records -> calendar grid -> SVG.
// Everything here is deterministic in its inputs so rendered output can be cached and golden-tested.

pub mod grid;
pub mod palette;
pub mod svg;

use chrono::NaiveDate;

use crate::activity_repo::ActivityRepo;
use crate::config::GraphConfig;
use crate::error::ApiError;
use crate::models::{DayRecord, RenderRequest, WeekStart};

pub use grid::{CalendarGrid, GridSummary, MonthLabel, build_grid, grid_window};
pub use palette::Palette;

/// Presentation policy shared by every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStyle {
    pub week_start: WeekStart,
    pub thresholds: [u32; 4],
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Sunday,
            thresholds: [1, 15, 60, 180],
        }
    }
}

impl GraphStyle {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            week_start: config.week_start,
            thresholds: config.level_thresholds,
        }
    }
}

/// Render `records` for `request`. `today` caps the in-range window.
pub fn render(
    request: &RenderRequest,
    today: NaiveDate,
    records: &[DayRecord],
    style: &GraphStyle,
) -> Result<String, ApiError> {
    let grid = build_grid(
        request,
        today,
        style.week_start,
        &style.thresholds,
        records,
    );
    svg::render(&grid, Palette::for_theme(request.theme))
        .map_err(|e| ApiError::Render(e.to_string()))
}

/// Read the request's window from the store and render it.
pub async fn render_from_store(
    repo: &ActivityRepo,
    request: &RenderRequest,
    today: NaiveDate,
    style: &GraphStyle,
) -> Result<String, ApiError> {
    let (from, to) = grid_window(request, style.week_start);
    let records = repo.get_range(from, to).await?;
    render(request, today, &records, style)
}
