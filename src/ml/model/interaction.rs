use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use super::{BoardModel, BoardOutput, ModelDims, cell_cross_entropy};
use crate::dataset::{CELL_CLASSES, CELL_COUNT, FeatureGroup, HINT_COUNT};
use crate::ml::batch::BoardBatch;

/// Hint embeddings contracted against a known-board weighting.
///
/// Each of the 20 hints is embedded by value and by position; the sum is
/// projected to `[n, 20, e]`. The known board yields one weight per hint
/// position, and `[n, 1, 20] x [n, 20, e]` reduces the hint matrix to a single
/// `e`-vector per board, which joins the level and known segments ahead of the
/// hidden layer.
#[derive(Module, Debug)]
pub struct InteractionNet<B: Backend> {
    hint_values: Embedding<B>,
    hint_positions: Embedding<B>,
    hint_projection: Linear<B>,
    known_weights: Linear<B>,
    level: Linear<B>,
    hidden: Linear<B>,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> InteractionNet<B> {
    pub fn new(dims: &ModelDims, device: &B::Device) -> Self {
        Self {
            hint_values: EmbeddingConfig::new(dims.hint_vocab, dims.embedding).init(device),
            hint_positions: EmbeddingConfig::new(HINT_COUNT, dims.embedding).init(device),
            hint_projection: LinearConfig::new(dims.embedding, dims.embedding).init(device),
            known_weights: LinearConfig::new(CELL_COUNT, HINT_COUNT).init(device),
            level: LinearConfig::new(1, dims.segment).init(device),
            hidden: LinearConfig::new(dims.segment + dims.embedding + CELL_COUNT, dims.hidden)
                .init(device),
            dropout: DropoutConfig::new(dims.dropout).init(),
            output: LinearConfig::new(dims.hidden + 1, CELL_CLASSES).init(device),
        }
    }
}

impl<B: Backend> BoardModel<B> for InteractionNet<B> {
    fn forward(&self, batch: BoardBatch<B>) -> BoardOutput<B> {
        let device = batch.features.device();
        let [n, _] = batch.features.dims();
        let level_cols = FeatureGroup::Level.columns();
        let known_cols = FeatureGroup::Known.columns();
        let level = batch
            .features
            .clone()
            .narrow(1, level_cols.start, level_cols.len());
        let known = batch.features.narrow(1, known_cols.start, known_cols.len());

        let positions = Tensor::<B, 1, Int>::arange(0..HINT_COUNT as i64, &device)
            .reshape([1, HINT_COUNT]);
        let hints = self.hint_values.forward(batch.hints) + self.hint_positions.forward(positions);
        let hints = self.hint_projection.forward(hints);

        let weights = self
            .known_weights
            .forward(known.clone())
            .reshape([n, 1, HINT_COUNT]);
        let embedding = hints.dims()[2];
        let interaction: Tensor<B, 2> = weights.matmul(hints).reshape([n, embedding]);

        let level = relu(self.level.forward(level));
        let x = Tensor::cat(vec![level, interaction, known], 1);
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        let x = Tensor::cat(vec![x, batch.cells], 1);
        let prediction = self.output.forward(x);

        let loss = cell_cross_entropy(prediction.clone(), batch.cell_class);
        BoardOutput { prediction, loss }
    }
}
