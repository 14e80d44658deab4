mod support;

use support::boards::{BoardGenerator, write_board_file};
use support::voltorb_env::VoltorbEnvGuard;
use tempfile::tempdir;
use voltorb::config::{self, TrainConfig};
use voltorb::dataset::{
    BatchSampler, CELL_CLASSES, CELL_COUNT, DataTable, FeatureGroup, LoadOptions,
    NormalizationScope, Split, load_table, normalize, split_rows,
};
use voltorb::ml::model::ModelKind;
use voltorb::ml::{TrainBackend, run_experiment};

fn small_config(model: ModelKind) -> TrainConfig {
    TrainConfig {
        model,
        steps: 1,
        eval_interval: 1,
        eval_iters: 2,
        batch_size: 4,
        hidden_size: 16,
        segment_size: 4,
        embedding_dim: 3,
        seed: 7,
        ..TrainConfig::default()
    }
}

fn synthetic_table(rows: usize, seed: u64) -> DataTable {
    let mut generator = BoardGenerator::new(seed);
    let rows: Vec<Vec<f32>> = (0..rows).map(|_| generator.generate().row()).collect();
    DataTable::from_rows(&rows).expect("synthetic rows")
}

#[test]
fn one_step_then_sweep_for_every_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("training_data.csv");
    write_board_file(&path, 10, 11);
    let table = load_table(&path, &LoadOptions::default()).unwrap();
    assert_eq!(table.len(), 10);

    let device = Default::default();
    for kind in ModelKind::ALL {
        let report = run_experiment::<TrainBackend>(&small_config(kind), &table, &device, |_| {})
            .unwrap_or_else(|err| panic!("{kind} run failed: {err}"));
        let loss = report.final_train_loss.expect("one step ran");
        assert!(loss.is_finite() && loss >= 0.0, "{kind} loss {loss}");
        assert_eq!((report.train_rows, report.held_out_rows), (9, 1));
        assert_eq!(report.estimates.len(), 1);
        assert_eq!(report.sweep.predicted.len(), CELL_COUNT);
        assert!(
            report
                .sweep
                .predicted
                .iter()
                .all(|&class| (class as usize) < CELL_CLASSES)
        );
        assert!(report.sweep.mean_loss.is_finite());
    }
}

#[test]
fn normalized_groups_span_unit_interval() {
    let table = synthetic_table(40, 3);
    let plan = ModelKind::Mlp.normalization_plan(NormalizationScope::PerGroup);
    let normalizer = normalize::fit(&table, &plan).unwrap();
    for group in FeatureGroup::ALL {
        let scaled: Vec<f32> = table
            .rows()
            .flat_map(|row| {
                row[group.columns()]
                    .iter()
                    .map(|&v| normalizer.apply(group, v))
                    .collect::<Vec<_>>()
            })
            .collect();
        assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)), "{group}");
        let min = scaled.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(min, 0.0, "{group}");
        assert!((max - 1.0).abs() < 1e-6, "{group}");
    }
}

#[test]
fn split_and_sampling_respect_bounds() {
    let rows: Vec<usize> = (0..37).collect();
    let data = split_rows(rows, 0.9);
    assert_eq!(data.train.len(), 33);
    assert_eq!(data.train.len() + data.held_out.len(), 37);

    let mut sampler = BatchSampler::new(5);
    for split in [Split::Train, Split::Validation] {
        let len = data.get(split).len();
        for _ in 0..50 {
            let picks = sampler.sample(len, 8);
            assert_eq!(picks.len(), 8);
            assert!(picks.iter().all(|p| p.row < len && p.cell < CELL_COUNT));
        }
    }
}

#[test]
fn app_directory_config_is_read_from_env_home() {
    let dir = tempdir().unwrap();
    let _guard = VoltorbEnvGuard::set_config_home(dir.path().to_path_buf());
    let cfg = TrainConfig {
        model: ModelKind::Split,
        steps: 3,
        ..TrainConfig::default()
    };
    let path = config::config_path().unwrap();
    assert!(path.starts_with(dir.path()));
    config::save_to_path(&cfg, &path).unwrap();
    assert_eq!(config::load_or_default().unwrap(), cfg);
}
