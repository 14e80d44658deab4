//! Per-cell inference sweeps over held-out boards.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::batch::BoardBatch;
use super::metrics::{ConfusionMatrix, HeldOutMetrics};
use super::model::{BoardModel, Objective};
use super::train::TrainError;
use crate::dataset::{BoardSample, CELL_CLASSES, MinMax, sweep_row};

/// Maps one row of model output to a cell class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellDecoder {
    /// Argmax over class logits.
    Classes,
    /// Regressed board value, de-normalized with `scale` when the target was scaled.
    Regression { scale: Option<MinMax> },
}

impl CellDecoder {
    pub fn new(objective: Objective, full_scale: Option<MinMax>) -> Self {
        match objective {
            Objective::CellClassification => Self::Classes,
            Objective::BoardRegression => Self::Regression { scale: full_scale },
        }
    }

    /// `output` is one prediction row; `cell` is the cell the row was asked about.
    pub fn decode(&self, output: &[f32], cell: usize) -> u8 {
        match self {
            Self::Classes => argmax(output) as u8,
            Self::Regression { scale } => {
                let value = output.get(cell).copied().unwrap_or(0.0);
                let raw = scale.map(|s| s.invert(value)).unwrap_or(value);
                if raw.is_finite() {
                    raw.round().clamp(0.0, (CELL_CLASSES - 1) as f32) as u8
                } else {
                    0
                }
            }
        }
    }
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (idx, &v)| {
            if v > best.1 { (idx, v) } else { best }
        })
        .0
}

/// Predicted and actual board for one held-out row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSweep {
    pub row: usize,
    pub predicted: Vec<u8>,
    pub actual: Vec<u8>,
    /// Loss averaged over the 25 single-cell inferences.
    pub mean_loss: f32,
}

impl CellSweep {
    pub fn correct(&self) -> usize {
        self.predicted
            .iter()
            .zip(&self.actual)
            .filter(|(p, a)| p == a)
            .count()
    }
}

/// Run one inference per cell of `samples[row]`, each a batch of a single pick.
pub fn sweep_cells<B, M>(
    model: &M,
    samples: &[BoardSample],
    row: usize,
    decoder: CellDecoder,
    device: &B::Device,
) -> Result<CellSweep, TrainError>
where
    B: Backend,
    M: BoardModel<B>,
{
    let sample = samples.get(row).ok_or(TrainError::EvalRowOutOfRange {
        row,
        len: samples.len(),
    })?;

    let mut predicted = Vec::with_capacity(sample.board.len());
    let mut total_loss = 0.0;
    let picks = sweep_row(row);
    for pick in &picks {
        let batch = BoardBatch::<B>::from_picks(samples, std::slice::from_ref(pick), device);
        let output = model.forward(batch);
        total_loss += output.loss.into_scalar().elem::<f32>();
        let values = prediction_values(output.prediction)?;
        predicted.push(decoder.decode(&values, pick.cell));
    }

    Ok(CellSweep {
        row,
        predicted,
        actual: sample.board.to_vec(),
        mean_loss: total_loss / picks.len() as f32,
    })
}

/// Sweep every row and accumulate a cell-class confusion matrix.
///
/// Each row is inferred as one batch of 25 picks.
pub fn held_out_metrics<B, M>(
    model: &M,
    samples: &[BoardSample],
    decoder: CellDecoder,
    device: &B::Device,
) -> Result<HeldOutMetrics, TrainError>
where
    B: Backend,
    M: BoardModel<B>,
{
    let mut confusion = ConfusionMatrix::for_cells();
    for (row, sample) in samples.iter().enumerate() {
        let picks = sweep_row(row);
        let batch = BoardBatch::<B>::from_picks(samples, &picks, device);
        let values = prediction_values(model.forward(batch).prediction)?;
        let width = values.len() / picks.len();
        for pick in &picks {
            let output = &values[pick.cell * width..(pick.cell + 1) * width];
            let guess = decoder.decode(output, pick.cell);
            confusion.add(sample.board[pick.cell] as usize, guess as usize);
        }
    }
    Ok(HeldOutMetrics::from_confusion(confusion))
}

/// Row-major prediction values; an empty read is an error, not an empty board.
fn prediction_values<B: Backend>(prediction: Tensor<B, 2>) -> Result<Vec<f32>, TrainError> {
    let [rows, width] = prediction.dims();
    let values = prediction
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| TrainError::PredictionRead {
            reason: format!("{err:?}"),
        })?;
    check_prediction_len(values, rows, width)
}

fn check_prediction_len(
    values: Vec<f32>,
    rows: usize,
    width: usize,
) -> Result<Vec<f32>, TrainError> {
    if values.len() != rows * width || width == 0 {
        return Err(TrainError::PredictionRead {
            reason: format!("expected {rows}x{width} values, got {}", values.len()),
        });
    }
    Ok(values)
}
