//! Board prediction networks, their training loop and evaluation.
//!
//! Everything here is generic over a burn backend; the CLI runs on the CPU
//! `NdArray` backend wrapped in `Autodiff`.

pub mod batch;
pub mod evaluate;
pub mod experiment;
pub mod metrics;
pub mod model;
pub mod train;

pub use experiment::{ExperimentError, ExperimentReport, TrainBackend, run_experiment};
