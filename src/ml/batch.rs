//! Tensor batches built from sampled picks.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::dataset::{BoardSample, CELL_COUNT, FEATURE_WIDTH, HINT_COUNT, Pick};

/// Every tensor a model variant may read; each variant uses a subset.
#[derive(Debug, Clone)]
pub struct BoardBatch<B: Backend> {
    /// `[n, FEATURE_WIDTH]` normalized level, hints and known board.
    pub features: Tensor<B, 2>,
    /// `[n, HINT_COUNT]` raw hint values as embedding ids.
    pub hints: Tensor<B, 2, Int>,
    /// `[n, 1]` picked cell index scaled to `[0, 1]`.
    pub cells: Tensor<B, 2>,
    /// `[n, CELL_COUNT]` full board regression target.
    pub target: Tensor<B, 2>,
    /// `[n]` class of the picked cell.
    pub cell_class: Tensor<B, 1, Int>,
}

impl<B: Backend> BoardBatch<B> {
    pub fn from_picks(samples: &[BoardSample], picks: &[Pick], device: &B::Device) -> Self {
        let n = picks.len();
        let mut features = Vec::with_capacity(n * FEATURE_WIDTH);
        let mut hints = Vec::with_capacity(n * HINT_COUNT);
        let mut cells = Vec::with_capacity(n);
        let mut target = Vec::with_capacity(n * CELL_COUNT);
        let mut cell_class = Vec::with_capacity(n);
        for pick in picks {
            let sample = &samples[pick.row];
            features.extend_from_slice(&sample.features);
            hints.extend_from_slice(&sample.hints);
            cells.push(pick.cell as f32 / (CELL_COUNT - 1) as f32);
            target.extend_from_slice(&sample.target);
            cell_class.push(sample.board[pick.cell] as i64);
        }
        Self {
            features: Tensor::from_data(TensorData::new(features, [n, FEATURE_WIDTH]), device),
            hints: Tensor::from_data(TensorData::new(hints, [n, HINT_COUNT]), device),
            cells: Tensor::from_data(TensorData::new(cells, [n, 1]), device),
            target: Tensor::from_data(TensorData::new(target, [n, CELL_COUNT]), device),
            cell_class: Tensor::from_data(TensorData::new(cell_class, [n]), device),
        }
    }

    pub fn len(&self) -> usize {
        self.features.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
