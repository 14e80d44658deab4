//! End-to-end run: normalize, split, train the selected model, evaluate.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::evaluate::{CellDecoder, CellSweep, held_out_metrics, sweep_cells};
use super::metrics::HeldOutMetrics;
use super::model::{BoardModel, InteractionNet, MlpNet, ModelKind, SplitNet};
use super::train::{LossEstimate, TrainError, TrainOptions, train};
use crate::config::{ConfigError, TrainConfig};
use crate::dataset::{
    BoardSample, DataTable, FeatureGroup, NormalizeError, PrepareError, SplitData, normalize,
    prepare_samples, split_rows,
};

/// CPU backend used by the CLI for training.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("Invalid training row: {0}")]
    Prepare(#[from] PrepareError),
    #[error("Training failed: {0}")]
    Train(#[from] TrainError),
}

/// Everything a run produced, ready to print or save as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub model: ModelKind,
    pub rows: usize,
    pub train_rows: usize,
    pub held_out_rows: usize,
    pub estimates: Vec<LossEstimate>,
    pub final_train_loss: Option<f32>,
    pub sweep: CellSweep,
    pub held_out: HeldOutMetrics,
}

/// Train `config.model` on `table` and evaluate it on the held-out rows.
pub fn run_experiment<B>(
    config: &TrainConfig,
    table: &DataTable,
    device: &B::Device,
    on_estimate: impl FnMut(&LossEstimate),
) -> Result<ExperimentReport, ExperimentError>
where
    B: AutodiffBackend,
    B::InnerBackend: Backend<Device = B::Device>,
{
    config.validate()?;
    let kind = config.model;
    let normalizer = normalize::fit(table, &kind.normalization_plan(config.normalization))?;
    let vocab = kind.embeds_hints().then_some(config.hint_vocab);
    let samples = prepare_samples(table, &normalizer, vocab)?;
    let data = split_rows(samples, config.train_fraction);
    info!(
        "Training {kind} on {} rows ({} train / {} held out)",
        table.len(),
        data.train.len(),
        data.held_out.len()
    );

    let run = Run {
        data: &data,
        options: config.train_options(),
        decoder: CellDecoder::new(kind.objective(), normalizer.scale_for(FeatureGroup::Full)),
        eval_row: config.eval_row,
    };
    let dims = config.model_dims();
    let outcome = match kind {
        ModelKind::Mlp => run.execute::<B, _>(MlpNet::new(&dims, device), device, on_estimate)?,
        ModelKind::Split => {
            run.execute::<B, _>(SplitNet::new(&dims, device), device, on_estimate)?
        }
        ModelKind::Interaction => {
            run.execute::<B, _>(InteractionNet::new(&dims, device), device, on_estimate)?
        }
    };

    info!(
        "Held-out accuracy {:.3} over {} cells",
        outcome.held_out.accuracy,
        outcome.held_out.confusion.total()
    );
    Ok(ExperimentReport {
        model: kind,
        rows: table.len(),
        train_rows: data.train.len(),
        held_out_rows: data.held_out.len(),
        estimates: outcome.estimates,
        final_train_loss: outcome.final_train_loss,
        sweep: outcome.sweep,
        held_out: outcome.held_out,
    })
}

struct Run<'a> {
    data: &'a SplitData<BoardSample>,
    options: TrainOptions,
    decoder: CellDecoder,
    eval_row: usize,
}

struct RunOutcome {
    estimates: Vec<LossEstimate>,
    final_train_loss: Option<f32>,
    sweep: CellSweep,
    held_out: HeldOutMetrics,
}

impl Run<'_> {
    fn execute<B, M>(
        &self,
        model: M,
        device: &B::Device,
        on_estimate: impl FnMut(&LossEstimate),
    ) -> Result<RunOutcome, TrainError>
    where
        B: AutodiffBackend,
        B::InnerBackend: Backend<Device = B::Device>,
        M: AutodiffModule<B> + BoardModel<B>,
        M::InnerModule: BoardModel<B::InnerBackend>,
    {
        if self.eval_row >= self.data.held_out.len() {
            return Err(TrainError::EvalRowOutOfRange {
                row: self.eval_row,
                len: self.data.held_out.len(),
            });
        }
        let trained = train::<B, M>(model, self.data, &self.options, device, on_estimate)?;
        let model = trained.model.valid();
        let held_out = &self.data.held_out;
        let sweep = sweep_cells::<B::InnerBackend, _>(
            &model,
            held_out,
            self.eval_row,
            self.decoder,
            device,
        )?;
        let metrics =
            held_out_metrics::<B::InnerBackend, _>(&model, held_out, self.decoder, device)?;
        Ok(RunOutcome {
            estimates: trained.estimates,
            final_train_loss: trained.last_loss,
            sweep,
            held_out: metrics,
        })
    }
}
