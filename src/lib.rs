//! Library exports for reuse in benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Training configuration.
pub mod config;
/// Board table loading, normalization and splitting.
pub mod dataset;
/// Logging setup.
pub mod logging;
/// Board prediction networks and their training loop.
pub mod ml;
