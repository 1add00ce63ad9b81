// Theme colors. Level colors follow GitHub's contribution graph.

use crate::models::{ActivityLevel, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    /// Cells outside the requested window (distinct from level 0 = zero activity).
    pub out_of_range: &'static str,
    pub levels: [&'static str; 5],
}

const LIGHT: Palette = Palette {
    background: "#ffffff",
    text: "#57606a",
    out_of_range: "#f6f8fa",
    levels: ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"],
};

const DARK: Palette = Palette {
    background: "#0d1117",
    text: "#7d8590",
    out_of_range: "#0f141a",
    levels: ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"],
};

impl Palette {
    pub fn for_theme(theme: Theme) -> &'static Palette {
        match theme {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }

    pub fn level(&self, level: ActivityLevel) -> &'static str {
        self.levels[(level.get() as usize).min(self.levels.len() - 1)]
    }
}
