// Render request and calendar grid types.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Graph color theme; serializes to lowercase ("light", "dark").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = RequestError;

    /// Exact lowercase names only; anything else is rejected rather than defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(RequestError::InvalidTheme(other.to_string())),
        }
    }
}

/// First weekday of each calendar column (row 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// Row index (0..7) of `date` within its column.
    pub fn row_of(self, date: NaiveDate) -> u32 {
        match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        }
    }

    /// The week-start day on or before `date`.
    pub fn column_start(self, date: NaiveDate) -> NaiveDate {
        date - chrono::Days::new(self.row_of(date) as u64)
    }
}

/// Parameters of one graph render. Derived from query parameters, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub theme: Theme,
    pub weeks: u32,
    pub reference_date: NaiveDate,
}

/// Discretized intensity 0..=4 used for color mapping (0 = no activity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActivityLevel(u8);

impl ActivityLevel {
    pub const NONE: ActivityLevel = ActivityLevel(0);
    pub const MAX: ActivityLevel = ActivityLevel(4);

    /// Level = number of thresholds `minutes` reaches. Thresholds must be ascending.
    pub fn from_minutes(minutes: u32, thresholds: &[u32; 4]) -> Self {
        ActivityLevel(thresholds.iter().take_while(|&&t| minutes >= t).count() as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// One day square of the calendar grid, built fresh per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub column: u32,
    pub row: u32,
    pub date: NaiveDate,
    pub active_minutes: u32,
    pub activity_level: ActivityLevel,
    pub is_in_range: bool,
}
