// Calendar grid and SVG rendering

mod common;

use common::{date, record};
use gpu_activity::graph::{self, GraphStyle, Palette, build_grid, grid_window};
use gpu_activity::models::{ActivityLevel, RenderRequest, Theme, WeekStart};

const THRESHOLDS: [u32; 4] = [1, 15, 60, 180];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn request(theme: Theme, weeks: u32, y: i32, m: u32, d: u32) -> RenderRequest {
    RenderRequest {
        theme,
        weeks,
        reference_date: date(y, m, d),
    }
}

#[test]
fn level_boundaries() {
    let cases = [
        (0, 0),
        (1, 1),
        (14, 1),
        (15, 2),
        (59, 2),
        (60, 3),
        (120, 3),
        (179, 3),
        (180, 4),
        (1440, 4),
    ];
    for (minutes, level) in cases {
        assert_eq!(
            ActivityLevel::from_minutes(minutes, &THRESHOLDS).get(),
            level,
            "{minutes} minutes"
        );
    }
}

#[test]
fn two_hours_renders_as_level_three() {
    let req = request(Theme::Light, 53, 2024, 6, 15);
    let svg = graph::render(
        &req,
        date(2024, 6, 15),
        &[record(date(2024, 6, 1), 120)],
        &GraphStyle::default(),
    )
    .unwrap();

    assert!(svg.contains(
        r##"fill="#30a14e" data-date="2024-06-01" data-level="3"><title>2024-06-01: 120 minutes of GPU activity</title>"##
    ));
    assert!(svg.contains(r##"fill="#ebedf0" data-date="2024-06-02" data-level="0""##));
}

#[test]
fn empty_year_is_all_level_zero() {
    let req = request(Theme::Light, 53, 2024, 6, 15);
    let grid = build_grid(&req, date(2024, 6, 15), WeekStart::Sunday, &THRESHOLDS, &[]);

    assert_eq!(grid.cells.len(), 371);
    assert!(grid.cells.iter().all(|c| c.is_in_range));
    assert!(grid.cells.iter().all(|c| c.activity_level == ActivityLevel::NONE));
    assert_eq!(grid.cells.last().unwrap().date, date(2024, 6, 15));
    assert_eq!(grid.origin, date(2023, 6, 11));

    let svg = graph::render(&req, date(2024, 6, 15), &[], &GraphStyle::default()).unwrap();
    assert_eq!(svg.matches(r#"data-level="0""#).count(), 371);
    assert!(svg.contains("0 active days | 0 day streak | 0 total hours"));
}

#[test]
fn month_labels_are_ordered_and_valid() {
    let req = request(Theme::Light, 53, 2024, 6, 15);
    let grid = build_grid(&req, date(2024, 6, 15), WeekStart::Sunday, &THRESHOLDS, &[]);

    assert!(!grid.month_labels.is_empty());
    assert!(
        grid.month_labels
            .windows(2)
            .all(|w| w[0].column < w[1].column)
    );
    for label in &grid.month_labels {
        assert!(label.column < 53);
        assert!(MONTHS.contains(&label.text.as_str()), "{}", label.text);
    }
    // June 2024 starts on a Saturday, in the column of 2024-05-26.
    let june = grid.month_labels.last().unwrap();
    assert_eq!(june.text, "Jun");
    let june_first = grid
        .cells
        .iter()
        .find(|c| c.date == date(2024, 6, 1))
        .unwrap();
    assert_eq!(june.column, june_first.column);
}

#[test]
fn days_after_today_are_out_of_range() {
    let req = request(Theme::Light, 4, 2024, 6, 15);
    let grid = build_grid(
        &req,
        date(2024, 6, 12),
        WeekStart::Sunday,
        &THRESHOLDS,
        &[record(date(2024, 6, 14), 500)],
    );
    let outside: Vec<_> = grid.cells.iter().filter(|c| !c.is_in_range).collect();
    assert_eq!(outside.len(), 3);
    assert!(outside.iter().all(|c| c.active_minutes == 0));

    let svg = graph::render(
        &req,
        date(2024, 6, 12),
        &[record(date(2024, 6, 14), 500)],
        &GraphStyle::default(),
    )
    .unwrap();
    assert_eq!(svg.matches("outside range").count(), 3);
    assert!(!svg.contains("500 minutes"));
}

#[test]
fn monday_week_start_shifts_rows() {
    let req = request(Theme::Light, 2, 2024, 6, 15);
    let sunday = build_grid(&req, date(2024, 6, 15), WeekStart::Sunday, &THRESHOLDS, &[]);
    let monday = build_grid(&req, date(2024, 6, 15), WeekStart::Monday, &THRESHOLDS, &[]);

    let find = |cells: &[gpu_activity::models::CalendarCell]| {
        *cells.iter().find(|c| c.date == date(2024, 6, 15)).unwrap()
    };
    // 2024-06-15 is a Saturday.
    assert_eq!(find(&sunday.cells).row, 6);
    assert_eq!(find(&monday.cells).row, 5);
    assert_eq!(monday.origin, date(2024, 6, 3));
    assert_eq!(monday.cells.last().unwrap().date, date(2024, 6, 16));
    assert!(!monday.cells.last().unwrap().is_in_range);
}

#[test]
fn grid_window_matches_cells() {
    let req = request(Theme::Dark, 10, 2024, 3, 1);
    let (from, to) = grid_window(&req, WeekStart::Sunday);
    let grid = build_grid(&req, date(2024, 3, 1), WeekStart::Sunday, &THRESHOLDS, &[]);
    assert_eq!(from, grid.origin);
    assert_eq!(to, date(2024, 3, 1));
    assert_eq!(grid.cells.len(), 70);
    for (i, cell) in grid.cells.iter().enumerate() {
        assert_eq!(cell.column, i as u32 / 7);
        assert_eq!(cell.row, i as u32 % 7);
    }
}

#[test]
fn records_outside_window_are_ignored() {
    let req = request(Theme::Light, 1, 2024, 6, 15);
    let grid = build_grid(
        &req,
        date(2024, 6, 15),
        WeekStart::Sunday,
        &THRESHOLDS,
        &[record(date(2024, 1, 1), 300)],
    );
    assert_eq!(grid.summary.active_days, 0);
    assert_eq!(grid.summary.total_minutes, 0);
}

#[test]
fn summary_counts_days_streak_and_hours() {
    let req = request(Theme::Light, 4, 2024, 6, 15);
    let records = [
        record(date(2024, 6, 10), 30),
        record(date(2024, 6, 13), 60),
        record(date(2024, 6, 14), 60),
        record(date(2024, 6, 15), 60),
    ];
    let grid = build_grid(&req, date(2024, 6, 15), WeekStart::Sunday, &THRESHOLDS, &records);
    assert_eq!(grid.summary.active_days, 4);
    assert_eq!(grid.summary.streak, 3);
    assert_eq!(grid.summary.total_minutes, 210);

    let svg = graph::render(&req, date(2024, 6, 15), &records, &GraphStyle::default()).unwrap();
    assert!(svg.contains("4 active days | 3 day streak | 4 total hours"));
}

#[test]
fn render_is_deterministic() {
    let req = request(Theme::Dark, 53, 2024, 6, 15);
    let records = [record(date(2024, 2, 29), 200), record(date(2024, 6, 1), 5)];
    let style = GraphStyle::default();
    let a = graph::render(&req, date(2024, 6, 15), &records, &style).unwrap();
    let b = graph::render(&req, date(2024, 6, 15), &records, &style).unwrap();
    assert_eq!(a, b);
}

#[test]
fn themes_use_their_palettes() {
    let req = request(Theme::Dark, 53, 2024, 6, 15);
    let svg = graph::render(&req, date(2024, 6, 15), &[], &GraphStyle::default()).unwrap();
    let dark = Palette::for_theme(Theme::Dark);
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains(&format!(r#"fill="{}""#, dark.background)));
    assert!(svg.contains(&format!(r#"fill="{}""#, dark.levels[0])));
    assert!(!svg.contains(Palette::for_theme(Theme::Light).levels[0]));

    // Legend shows every level swatch.
    for color in dark.levels {
        assert!(svg.contains(color));
    }
}

#[test]
fn out_of_range_color_differs_from_empty_day() {
    for theme in Theme::ALL {
        let p = Palette::for_theme(theme);
        assert_ne!(p.out_of_range, p.levels[0]);
        assert_eq!(p.level(ActivityLevel::MAX), p.levels[4]);
    }
}

#[test]
fn single_week_two_hours_is_level_three() {
    let req = request(Theme::Light, 1, 2024, 6, 1);
    let records = [record(date(2024, 6, 1), 120)];
    let grid = build_grid(&req, date(2024, 6, 1), WeekStart::Sunday, &THRESHOLDS, &records);

    assert_eq!(grid.cells.len(), 7);
    assert_eq!(grid.origin, date(2024, 5, 26));
    assert!(grid.cells.iter().all(|c| c.is_in_range));
    let cell = grid.cells.last().unwrap();
    assert_eq!(cell.date, date(2024, 6, 1));
    assert_eq!(cell.activity_level.get(), 3);

    let svg = graph::render(&req, date(2024, 6, 1), &records, &GraphStyle::default()).unwrap();
    let light = Palette::for_theme(Theme::Light);
    assert!(svg.contains(&format!(
        r#"fill="{}" data-date="2024-06-01" data-level="3""#,
        light.levels[3]
    )));
    assert_ne!(light.levels[3], light.levels[0]);
    assert_eq!(svg.matches(r#"data-level="0""#).count(), 6);
}
