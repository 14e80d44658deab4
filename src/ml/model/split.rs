use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use super::{BoardModel, BoardOutput, ModelDims, cell_cross_entropy};
use crate::dataset::{CELL_CLASSES, FeatureGroup};
use crate::ml::batch::BoardBatch;

/// Separate sub-networks for level, hints and known board, joined by a hidden
/// layer; the cell index enters right before the class head.
#[derive(Module, Debug)]
pub struct SplitNet<B: Backend> {
    level: Linear<B>,
    hints: Linear<B>,
    known: Linear<B>,
    hidden: Linear<B>,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> SplitNet<B> {
    pub fn new(dims: &ModelDims, device: &B::Device) -> Self {
        let segment = |group: FeatureGroup| {
            LinearConfig::new(group.columns().len(), dims.segment).init(device)
        };
        Self {
            level: segment(FeatureGroup::Level),
            hints: segment(FeatureGroup::Voltorb),
            known: segment(FeatureGroup::Known),
            hidden: LinearConfig::new(3 * dims.segment, dims.hidden).init(device),
            dropout: DropoutConfig::new(dims.dropout).init(),
            output: LinearConfig::new(dims.hidden + 1, CELL_CLASSES).init(device),
        }
    }
}

impl<B: Backend> BoardModel<B> for SplitNet<B> {
    fn forward(&self, batch: BoardBatch<B>) -> BoardOutput<B> {
        let segment = |group: FeatureGroup| {
            let cols = group.columns();
            batch.features.clone().narrow(1, cols.start, cols.len())
        };
        let level = relu(self.level.forward(segment(FeatureGroup::Level)));
        let hints = relu(self.hints.forward(segment(FeatureGroup::Voltorb)));
        let known = relu(self.known.forward(segment(FeatureGroup::Known)));

        let x = Tensor::cat(vec![level, hints, known], 1);
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        let x = Tensor::cat(vec![x, batch.cells], 1);
        let prediction = self.output.forward(x);

        let loss = cell_cross_entropy(prediction.clone(), batch.cell_class);
        BoardOutput { prediction, loss }
    }
}
