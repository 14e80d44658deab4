//! Board table loading, normalization and splitting.

pub mod layout;
pub mod loader;
pub mod normalize;
pub mod samples;
pub mod split;

pub use layout::{CELL_CLASSES, CELL_COUNT, FEATURE_WIDTH, FeatureGroup, HINT_COUNT, ROW_WIDTH};
pub use loader::{DataTable, DatasetLoadError, HeaderMode, LoadOptions, load_table, parse_table};
pub use normalize::{FittedNormalizer, MinMax, NormalizationPlan, NormalizationScope, NormalizeError};
pub use samples::{BoardSample, PrepareError, prepare_samples};
pub use split::{BatchSampler, DEFAULT_TRAIN_FRACTION, Pick, Split, SplitData, split_rows, sweep_row};
