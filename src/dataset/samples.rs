//! Per-row training samples derived from a loaded table.

use thiserror::Error;

use super::layout::{CELL_CLASSES, CELL_COUNT, FEATURE_WIDTH, FeatureGroup, HINT_COUNT};
use super::loader::DataTable;
use super::normalize::FittedNormalizer;

#[derive(Debug, Error, PartialEq)]
pub enum PrepareError {
    #[error("row {row}, cell {cell}: board value {value} is not a cell class 0..{CELL_CLASSES}")]
    LabelOutOfRange { row: usize, cell: usize, value: f32 },
    #[error("row {row}, hint {hint}: value {value} is not an id below {vocab}")]
    HintOutOfRange {
        row: usize,
        hint: usize,
        value: f32,
        vocab: usize,
    },
}

/// One board, ready for batching.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSample {
    /// Level, hints and known board after normalization.
    pub features: [f32; FEATURE_WIDTH],
    /// Full board after normalization; the regression target.
    pub target: [f32; CELL_COUNT],
    /// Raw hint values used as embedding ids.
    pub hints: [i64; HINT_COUNT],
    /// Full board as cell classes.
    pub board: [u8; CELL_COUNT],
}

/// Normalize every row and extract class labels and hint ids.
///
/// With `hint_vocab` set, every hint must be a whole number below it.
pub fn prepare_samples(
    table: &DataTable,
    normalizer: &FittedNormalizer,
    hint_vocab: Option<usize>,
) -> Result<Vec<BoardSample>, PrepareError> {
    let hint_cols = FeatureGroup::Voltorb.columns();
    let full_cols = FeatureGroup::Full.columns();
    table
        .rows()
        .enumerate()
        .map(|(row_idx, raw)| -> Result<BoardSample, PrepareError> {
            let scaled = normalizer.apply_row(raw);
            let mut sample = BoardSample {
                features: [0.0; FEATURE_WIDTH],
                target: [0.0; CELL_COUNT],
                hints: [0; HINT_COUNT],
                board: [0; CELL_COUNT],
            };
            sample.features.copy_from_slice(&scaled[..FEATURE_WIDTH]);
            sample.target.copy_from_slice(&scaled[full_cols.clone()]);

            for (hint, &value) in raw[hint_cols.clone()].iter().enumerate() {
                sample.hints[hint] = hint_id(value, hint_vocab).ok_or(PrepareError::HintOutOfRange {
                    row: row_idx,
                    hint,
                    value,
                    vocab: hint_vocab.unwrap_or(0),
                })?;
            }
            for (cell, &value) in raw[full_cols.clone()].iter().enumerate() {
                sample.board[cell] = cell_class(value).ok_or(PrepareError::LabelOutOfRange {
                    row: row_idx,
                    cell,
                    value,
                })?;
            }
            Ok(sample)
        })
        .collect()
}

fn cell_class(value: f32) -> Option<u8> {
    if value.fract() != 0.0 || !(0.0..CELL_CLASSES as f32).contains(&value) {
        return None;
    }
    Some(value as u8)
}

fn hint_id(value: f32, vocab: Option<usize>) -> Option<i64> {
    match vocab {
        Some(vocab) => {
            if value.fract() != 0.0 || value < 0.0 || value >= vocab as f32 {
                return None;
            }
            Some(value as i64)
        }
        None => Some(value.round().max(0.0) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::layout::ROW_WIDTH;
    use crate::dataset::normalize::{NormalizationPlan, NormalizationScope, fit};

    fn row(level: f32, hint: f32, board_value: f32) -> Vec<f32> {
        let mut row = vec![0.0; ROW_WIDTH];
        row[0] = level;
        for col in FeatureGroup::Voltorb.columns() {
            row[col] = hint;
        }
        for col in FeatureGroup::Known.columns() {
            row[col] = -1.0;
        }
        for col in FeatureGroup::Full.columns() {
            row[col] = board_value;
        }
        row
    }

    fn level_only() -> NormalizationPlan {
        NormalizationPlan {
            groups: vec![FeatureGroup::Level],
            scope: NormalizationScope::PerGroup,
        }
    }

    #[test]
    fn extracts_features_labels_and_hint_ids() {
        let table = DataTable::from_rows(&[row(1.0, 3.0, 2.0), row(5.0, 7.0, 1.0)]).unwrap();
        let normalizer = fit(&table, &level_only()).unwrap();
        let samples = prepare_samples(&table, &normalizer, Some(16)).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].features[0], 0.0);
        assert_eq!(samples[1].features[0], 1.0);
        assert_eq!(samples[1].features[1], 7.0);
        assert_eq!(samples[0].hints, [3; HINT_COUNT]);
        assert_eq!(samples[0].board, [2; CELL_COUNT]);
        assert_eq!(samples[1].target, [1.0; CELL_COUNT]);
    }

    #[test]
    fn rejects_board_values_outside_classes() {
        let table = DataTable::from_rows(&[row(1.0, 3.0, 2.0), row(5.0, 7.0, 4.0)]).unwrap();
        let normalizer = fit(&table, &level_only()).unwrap();
        let err = prepare_samples(&table, &normalizer, None).unwrap_err();
        assert_eq!(
            err,
            PrepareError::LabelOutOfRange {
                row: 1,
                cell: 0,
                value: 4.0
            }
        );
    }

    #[test]
    fn rejects_hints_beyond_vocab() {
        let table = DataTable::from_rows(&[row(1.0, 3.0, 2.0), row(5.0, 16.0, 1.0)]).unwrap();
        let normalizer = fit(&table, &level_only()).unwrap();
        assert!(prepare_samples(&table, &normalizer, None).is_ok());
        let err = prepare_samples(&table, &normalizer, Some(16)).unwrap_err();
        assert!(matches!(err, PrepareError::HintOutOfRange { row: 1, hint: 0, .. }));
    }
}
