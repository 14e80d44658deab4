//! SGD training loop with periodic loss estimation.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::batch::BoardBatch;
use super::model::BoardModel;
use crate::dataset::{BatchSampler, BoardSample, Split, SplitData};

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    #[error("the {split} split has no rows")]
    EmptySplit { split: &'static str },
    #[error("training loss became non-finite ({loss}) at step {step}")]
    NonFiniteLoss { step: usize, loss: f32 },
    #[error("evaluation row {row} is outside the held-out split ({len} rows)")]
    EvalRowOutOfRange { row: usize, len: usize },
    #[error("invalid training options: {0}")]
    InvalidOptions(String),
    #[error("failed to read model predictions: {reason}")]
    PredictionRead { reason: String },
}

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub learning_rate: f64,
    pub steps: usize,
    /// Steps between loss estimates; step 0 is always estimated.
    pub eval_interval: usize,
    /// Batches averaged per split for each estimate.
    pub eval_iters: usize,
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            steps: 10_000,
            eval_interval: 1_000,
            eval_iters: 200,
            batch_size: 8,
            seed: 1337,
        }
    }
}

impl TrainOptions {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::InvalidOptions("batch_size must be at least 1".into()));
        }
        if self.eval_interval == 0 {
            return Err(TrainError::InvalidOptions("eval_interval must be at least 1".into()));
        }
        if self.eval_iters == 0 {
            return Err(TrainError::InvalidOptions("eval_iters must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidOptions(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Mean sampled loss on both splits at one point of training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossEstimate {
    pub step: usize,
    pub train: f32,
    pub val: f32,
}

impl std::fmt::Display for LossEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "step {}: train loss {:.6}, val loss {:.6}",
            self.step, self.train, self.val
        )
    }
}

pub struct TrainOutcome<M> {
    pub model: M,
    pub estimates: Vec<LossEstimate>,
    /// Loss of the last optimized batch; `None` when no step ran.
    pub last_loss: Option<f32>,
}

/// Run `options.steps` SGD steps on randomly sampled training batches.
///
/// Each step samples a batch, runs the forward pass, backpropagates the loss
/// and applies the optimizer. Every `eval_interval` steps the model is
/// evaluated without autodiff on both splits before training continues.
pub fn train<B, M>(
    model: M,
    data: &SplitData<BoardSample>,
    options: &TrainOptions,
    device: &B::Device,
    mut on_estimate: impl FnMut(&LossEstimate),
) -> Result<TrainOutcome<M>, TrainError>
where
    B: AutodiffBackend,
    B::InnerBackend: Backend<Device = B::Device>,
    M: AutodiffModule<B> + BoardModel<B>,
    M::InnerModule: BoardModel<B::InnerBackend>,
{
    options.validate()?;
    for split in [Split::Train, Split::Validation] {
        if data.get(split).is_empty() {
            return Err(TrainError::EmptySplit { split: split.name() });
        }
    }

    let mut sampler = BatchSampler::new(options.seed);
    let mut optim = SgdConfig::new().init::<B, M>();
    let mut model = model;
    let mut estimates = Vec::new();
    let mut last_loss = None;

    for step in 0..options.steps {
        if step % options.eval_interval == 0 {
            let estimate = estimate_loss(&model.valid(), data, options, &mut sampler, device, step);
            info!("{estimate}");
            on_estimate(&estimate);
            estimates.push(estimate);
        }

        let picks = sampler.sample(data.train.len(), options.batch_size);
        let batch = BoardBatch::<B>::from_picks(&data.train, &picks, device);
        let output = model.forward(batch);
        let loss = output.loss.clone().into_scalar().elem::<f32>();
        if !loss.is_finite() {
            return Err(TrainError::NonFiniteLoss { step, loss });
        }

        let grads = GradientsParams::from_grads(output.loss.backward(), &model);
        model = optim.step(options.learning_rate, model, grads);
        last_loss = Some(loss);
        debug!("step {step}: batch loss {loss:.6}");
    }

    Ok(TrainOutcome {
        model,
        estimates,
        last_loss,
    })
}

/// Average loss over `eval_iters` sampled batches of each split.
pub fn estimate_loss<B, M>(
    model: &M,
    data: &SplitData<BoardSample>,
    options: &TrainOptions,
    sampler: &mut BatchSampler,
    device: &B::Device,
    step: usize,
) -> LossEstimate
where
    B: Backend,
    M: BoardModel<B>,
{
    let mut mean_for = |split: Split| {
        let rows = data.get(split);
        let total: f32 = (0..options.eval_iters)
            .map(|_| {
                let picks = sampler.sample(rows.len(), options.batch_size);
                let batch = BoardBatch::<B>::from_picks(rows, &picks, device);
                model.forward(batch).loss.into_scalar().elem::<f32>()
            })
            .sum();
        total / options.eval_iters.max(1) as f32
    };
    let train = mean_for(Split::Train);
    let val = mean_for(Split::Validation);
    LossEstimate { step, train, val }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CELL_COUNT, FEATURE_WIDTH, HINT_COUNT, split_rows};
    use crate::ml::model::{MlpNet, ModelDims, SplitNet};
    use burn::backend::{Autodiff, NdArray};

    type TestAutodiff = Autodiff<NdArray>;

    fn dims() -> ModelDims {
        ModelDims {
            hidden: 8,
            segment: 4,
            embedding: 2,
            hint_vocab: 16,
            dropout: 0.0,
        }
    }

    fn data(rows: usize) -> SplitData<BoardSample> {
        let samples = (0..rows)
            .map(|i| {
                let mut board = [0u8; CELL_COUNT];
                for (j, b) in board.iter_mut().enumerate() {
                    *b = ((i + j) % 4) as u8;
                }
                BoardSample {
                    features: [(i % 3) as f32 / 2.0; FEATURE_WIDTH],
                    target: board.map(|b| b as f32 / 3.0),
                    hints: [1; HINT_COUNT],
                    board,
                }
            })
            .collect();
        split_rows(samples, 0.9)
    }

    fn options(steps: usize) -> TrainOptions {
        TrainOptions {
            steps,
            eval_interval: 2,
            eval_iters: 3,
            batch_size: 4,
            ..TrainOptions::default()
        }
    }

    #[test]
    fn estimates_at_step_zero_and_each_interval() {
        let device = Default::default();
        let model = SplitNet::<TestAutodiff>::new(&dims(), &device);
        let mut seen = Vec::new();
        let outcome =
            train::<TestAutodiff, _>(model, &data(10), &options(5), &device, |e| seen.push(e.step))
                .unwrap();
        assert_eq!(seen, vec![0, 2, 4]);
        assert_eq!(outcome.estimates.len(), 3);
        let last = outcome.last_loss.unwrap();
        assert!(last.is_finite() && last >= 0.0);
        for estimate in &outcome.estimates {
            assert!(estimate.train.is_finite() && estimate.val.is_finite());
        }
    }

    #[test]
    fn zero_steps_trains_nothing() {
        let device = Default::default();
        let model = MlpNet::<TestAutodiff>::new(&dims(), &device);
        let outcome = train::<TestAutodiff, _>(model, &data(10), &options(0), &device, |_| {}).unwrap();
        assert!(outcome.estimates.is_empty());
        assert_eq!(outcome.last_loss, None);
    }

    #[test]
    fn empty_splits_are_rejected() {
        let device = Default::default();
        let rows = data(10);
        let no_held_out = SplitData {
            train: rows.train.clone(),
            held_out: Vec::new(),
        };
        let model = MlpNet::<TestAutodiff>::new(&dims(), &device);
        let err = train::<TestAutodiff, _>(model, &no_held_out, &options(1), &device, |_| {})
            .err()
            .unwrap();
        assert_eq!(err, TrainError::EmptySplit { split: "val" });

        let single = data(1);
        assert!(single.train.is_empty());
        let model = MlpNet::<TestAutodiff>::new(&dims(), &device);
        let err = train::<TestAutodiff, _>(model, &single, &options(1), &device, |_| {})
            .err()
            .unwrap();
        assert_eq!(err, TrainError::EmptySplit { split: "train" });
    }

    #[test]
    fn nan_features_stop_training_at_first_step() {
        let device = Default::default();
        let mut rows = data(10);
        for sample in rows.train.iter_mut().chain(rows.held_out.iter_mut()) {
            sample.features[0] = f32::NAN;
        }
        let model = MlpNet::<TestAutodiff>::new(&dims(), &device);
        let err = train::<TestAutodiff, _>(model, &rows, &options(3), &device, |_| {})
            .err()
            .unwrap();
        assert!(
            matches!(err, TrainError::NonFiniteLoss { step: 0, loss } if loss.is_nan()),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn invalid_options_fail_fast() {
        let mut opts = options(1);
        opts.eval_interval = 0;
        assert!(opts.validate().is_err());
        opts = options(1);
        opts.learning_rate = f64::NAN;
        assert!(opts.validate().is_err());
        assert!(options(1).validate().is_ok());
    }

    #[test]
    fn estimate_line_matches_console_format() {
        let line = LossEstimate {
            step: 1000,
            train: 0.5,
            val: 0.25,
        }
        .to_string();
        assert_eq!(line, "step 1000: train loss 0.500000, val loss 0.250000");
    }
}
