use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use super::{BoardModel, BoardOutput, ModelDims, mean_absolute_error};
use crate::dataset::{CELL_COUNT, FEATURE_WIDTH};
use crate::ml::batch::BoardBatch;

/// Two stacked linear layers from the 46 input values to all 25 cells.
#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    input: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> MlpNet<B> {
    pub fn new(dims: &ModelDims, device: &B::Device) -> Self {
        Self {
            input: LinearConfig::new(FEATURE_WIDTH, dims.hidden).init(device),
            output: LinearConfig::new(dims.hidden, CELL_COUNT).init(device),
        }
    }
}

impl<B: Backend> BoardModel<B> for MlpNet<B> {
    fn forward(&self, batch: BoardBatch<B>) -> BoardOutput<B> {
        let x = self.input.forward(batch.features);
        let prediction = self.output.forward(x);
        let loss = mean_absolute_error(prediction.clone(), batch.target);
        BoardOutput { prediction, loss }
    }
}
