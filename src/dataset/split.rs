//! Ordered train/held-out split and random batch sampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::layout::CELL_COUNT;

/// Default share of rows used for training.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Validation,
}

impl Split {
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "val",
        }
    }
}

/// Training rows followed by held-out rows, in file order.
#[derive(Debug, Clone)]
pub struct SplitData<T> {
    pub train: Vec<T>,
    pub held_out: Vec<T>,
}

impl<T> SplitData<T> {
    pub fn get(&self, split: Split) -> &[T] {
        match split {
            Split::Train => &self.train,
            Split::Validation => &self.held_out,
        }
    }
}

/// Number of training rows for a dataset of `len` rows: `floor(fraction * len)`.
pub fn train_len(len: usize, fraction: f64) -> usize {
    ((len as f64 * fraction).floor() as usize).min(len)
}

/// Cut `rows` at the training boundary without reordering.
pub fn split_rows<T>(mut rows: Vec<T>, train_fraction: f64) -> SplitData<T> {
    let held_out = rows.split_off(train_len(rows.len(), train_fraction));
    SplitData {
        train: rows,
        held_out,
    }
}

/// A sampled row paired with the board cell it is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub row: usize,
    pub cell: usize,
}

/// Uniform sampling with replacement, reproducible from a seed.
#[derive(Debug, Clone)]
pub struct BatchSampler {
    rng: StdRng,
}

impl BatchSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `batch_size` picks from a split of `len` rows.
    ///
    /// Returns an empty batch when the split is empty.
    pub fn sample(&mut self, len: usize, batch_size: usize) -> Vec<Pick> {
        if len == 0 {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| Pick {
                row: self.rng.random_range(0..len),
                cell: self.rng.random_range(0..CELL_COUNT),
            })
            .collect()
    }
}

/// Every cell of one row, in board order.
pub fn sweep_row(row: usize) -> Vec<Pick> {
    (0..CELL_COUNT).map(|cell| Pick { row, cell }).collect()
}
