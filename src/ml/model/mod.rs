//! Board prediction networks.
//!
//! Three interchangeable architectures share the [`BoardModel`] contract:
//! - [`MlpNet`]: two linear layers regressing the whole board.
//! - [`SplitNet`]: per-segment sub-networks plus the asked-about cell index, classifying one cell.
//! - [`InteractionNet`]: hint and position embeddings contracted against the known board,
//!   classifying one cell.

mod interaction;
mod mlp;
mod split;

pub use interaction::InteractionNet;
pub use mlp::MlpNet;
pub use split::SplitNet;

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::batch::BoardBatch;
use crate::dataset::{FeatureGroup, NormalizationPlan, NormalizationScope};

/// Prediction together with its loss against the batch targets.
#[derive(Debug, Clone)]
pub struct BoardOutput<B: Backend> {
    /// `[n, CELL_COUNT]` board values or `[n, CELL_CLASSES]` cell logits.
    pub prediction: Tensor<B, 2>,
    pub loss: Tensor<B, 1>,
}

pub trait BoardModel<B: Backend> {
    fn forward(&self, batch: BoardBatch<B>) -> BoardOutput<B>;
}

/// What a model predicts and how it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// All 25 cells as normalized values, mean absolute error.
    BoardRegression,
    /// One cell's class, cross-entropy.
    CellClassification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Mlp,
    Split,
    #[default]
    Interaction,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Mlp, ModelKind::Split, ModelKind::Interaction];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mlp" | "a" => Some(Self::Mlp),
            "split" | "b" => Some(Self::Split),
            "interaction" | "c" => Some(Self::Interaction),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mlp => "mlp",
            Self::Split => "split",
            Self::Interaction => "interaction",
        }
    }

    pub fn objective(self) -> Objective {
        match self {
            Self::Mlp => Objective::BoardRegression,
            Self::Split | Self::Interaction => Objective::CellClassification,
        }
    }

    /// Groups scaled for this architecture.
    ///
    /// Class targets stay raw for every classifier, and hints stay raw where they are
    /// embedding ids.
    pub fn normalization_plan(self, scope: NormalizationScope) -> NormalizationPlan {
        let groups = match self {
            Self::Mlp => FeatureGroup::ALL.to_vec(),
            Self::Split => vec![FeatureGroup::Level, FeatureGroup::Voltorb, FeatureGroup::Known],
            Self::Interaction => vec![FeatureGroup::Level, FeatureGroup::Known],
        };
        NormalizationPlan { groups, scope }
    }

    /// Whether hint values are looked up in an embedding table.
    pub fn embeds_hints(self) -> bool {
        self == Self::Interaction
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer sizes shared by the architectures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelDims {
    pub hidden: usize,
    /// Width of each per-segment sub-network.
    pub segment: usize,
    pub embedding: usize,
    /// Number of distinct hint ids.
    pub hint_vocab: usize,
    pub dropout: f64,
}

fn mean_absolute_error<B: Backend>(prediction: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    (prediction - target).abs().mean()
}

fn cell_cross_entropy<B: Backend>(logits: Tensor<B, 2>, classes: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, classes)
}
