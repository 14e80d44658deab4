//! Column layout of a training row.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Number of values in one row of the training table.
pub const ROW_WIDTH: usize = 71;
/// Number of model input values (level, hints, known board).
pub const FEATURE_WIDTH: usize = 46;
/// Cells on the 5x5 board.
pub const CELL_COUNT: usize = 25;
/// Row/column hint values: point sum and Voltorb count for 5 rows and 5 columns.
pub const HINT_COUNT: usize = 20;
/// Distinct cell values a board cell can hold.
pub const CELL_CLASSES: usize = 4;
/// Display names for cell classes, indexed by class id.
pub const CELL_CLASS_NAMES: [&str; CELL_CLASSES] = ["one", "voltorb", "two", "three"];
/// Marker for an unrevealed cell in the known board.
pub const UNKNOWN_CELL: f32 = -1.0;

/// A contiguous column range normalized as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    Level,
    Voltorb,
    Known,
    Full,
}

impl FeatureGroup {
    pub const ALL: [FeatureGroup; 4] = [
        FeatureGroup::Level,
        FeatureGroup::Voltorb,
        FeatureGroup::Known,
        FeatureGroup::Full,
    ];

    /// Columns covered by the group within a row.
    pub fn columns(self) -> Range<usize> {
        match self {
            FeatureGroup::Level => 0..1,
            FeatureGroup::Voltorb => 1..1 + HINT_COUNT,
            FeatureGroup::Known => 1 + HINT_COUNT..FEATURE_WIDTH,
            FeatureGroup::Full => FEATURE_WIDTH..ROW_WIDTH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureGroup::Level => "level",
            FeatureGroup::Voltorb => "voltorb",
            FeatureGroup::Known => "known",
            FeatureGroup::Full => "full",
        }
    }

    /// Group owning `column`, if the column is inside a row.
    pub fn of_column(column: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| group.columns().contains(&column))
    }
}

impl std::fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
