// SVG markup from a calendar grid. Pure: same grid + palette -> same bytes.

use std::fmt::{self, Write};

use chrono::Weekday;

use super::grid::CalendarGrid;
use super::palette::Palette;

const CELL: u32 = 11;
const STEP: u32 = 13;
const LEFT: u32 = 32;
const TOP: u32 = 20;
const RIGHT_PAD: u32 = 10;
const MIN_WIDTH: u32 = 330;
const LEGEND_GAP: u32 = 8;
const FONT: &str = "-apple-system, BlinkMacSystemFont, Segoe UI, Helvetica, Arial, sans-serif";

/// Pixel size of the whole image for a grid of `weeks` columns.
pub fn dimensions(weeks: u32) -> (u32, u32) {
    let width = (LEFT + weeks * STEP + RIGHT_PAD).max(MIN_WIDTH);
    let height = legend_top() + CELL + 40;
    (width, height)
}

fn legend_top() -> u32 {
    TOP + 7 * STEP + LEGEND_GAP
}

pub fn render(grid: &CalendarGrid, palette: &Palette) -> Result<String, fmt::Error> {
    let (width, height) = dimensions(grid.weeks);
    let mut out = String::with_capacity(grid.cells.len() * 160 + 2048);

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img" aria-label="GPU activity">"#,
        w = width,
        h = height
    )?;
    writeln!(
        out,
        r#"<rect width="{}" height="{}" fill="{}" rx="3"/>"#,
        width, height, palette.background
    )?;

    writeln!(
        out,
        r#"<g font-family="{}" font-size="10" fill="{}">"#,
        FONT, palette.text
    )?;
    for label in &grid.month_labels {
        writeln!(
            out,
            r#"<text x="{}" y="{}">{}</text>"#,
            LEFT + label.column * STEP,
            TOP - 8,
            label.text
        )?;
    }
    let mut weekday = grid.week_start.weekday();
    for row in 0..7 {
        if let Some(name) = weekday_label(weekday) {
            writeln!(
                out,
                r#"<text x="4" y="{}">{}</text>"#,
                TOP + row * STEP + 9,
                name
            )?;
        }
        weekday = weekday.succ();
    }
    writeln!(out, "</g>")?;

    writeln!(out, "<g>")?;
    for cell in &grid.cells {
        let x = LEFT + cell.column * STEP;
        let y = TOP + cell.row * STEP;
        let date = cell.date.format("%Y-%m-%d");
        if cell.is_in_range {
            writeln!(
                out,
                r#"<rect x="{x}" y="{y}" width="{CELL}" height="{CELL}" rx="2" fill="{fill}" data-date="{date}" data-level="{level}"><title>{date}: {minutes} minutes of GPU activity</title></rect>"#,
                fill = palette.level(cell.activity_level),
                level = cell.activity_level.get(),
                minutes = cell.active_minutes,
            )?;
        } else {
            writeln!(
                out,
                r#"<rect x="{x}" y="{y}" width="{CELL}" height="{CELL}" rx="2" fill="{fill}" data-date="{date}"><title>{date}: outside range</title></rect>"#,
                fill = palette.out_of_range,
            )?;
        }
    }
    writeln!(out, "</g>")?;

    write_legend(&mut out, grid, palette)?;
    writeln!(out, "</svg>")?;
    Ok(out)
}

fn write_legend(out: &mut String, grid: &CalendarGrid, palette: &Palette) -> fmt::Result {
    let top = legend_top();
    let swatches_x = LEFT + 30;
    writeln!(
        out,
        r#"<g font-family="{}" font-size="10" fill="{}">"#,
        FONT, palette.text
    )?;
    writeln!(out, r#"<text x="{}" y="{}">Less</text>"#, LEFT, top + 9)?;
    for (i, color) in palette.levels.iter().enumerate() {
        writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{CELL}" height="{CELL}" rx="2" fill="{}"/>"#,
            swatches_x + i as u32 * STEP,
            top,
            color
        )?;
    }
    writeln!(
        out,
        r#"<text x="{}" y="{}">More</text>"#,
        swatches_x + palette.levels.len() as u32 * STEP + 4,
        top + 9
    )?;

    let s = grid.summary;
    let hours = (s.total_minutes as f64 / 60.0).round() as u64;
    writeln!(
        out,
        r#"<text x="{}" y="{}" font-size="11">{} active days | {} day streak | {} total hours</text>"#,
        LEFT,
        top + CELL + 22,
        s.active_days,
        s.streak,
        hours
    )?;
    writeln!(out, "</g>")
}

fn weekday_label(day: Weekday) -> Option<&'static str> {
    match day {
        Weekday::Mon => Some("Mon"),
        Weekday::Wed => Some("Wed"),
        Weekday::Fri => Some("Fri"),
        _ => None,
    }
}
