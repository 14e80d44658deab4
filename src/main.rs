//! Trains a Voltorb Flip board predictor and reports held-out accuracy.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use voltorb::config::{self, TrainConfig};
use voltorb::dataset::{HeaderMode, NormalizationScope, load_table};
use voltorb::logging;
use voltorb::ml::model::ModelKind;
use voltorb::ml::{ExperimentReport, TrainBackend, run_experiment};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let logging_active = match logging::init("info") {
        Ok(_) => true,
        Err(err) => {
            eprintln!("Logging disabled: {err}");
            false
        }
    };

    let mut cfg = match &options.config_path {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("Config file not found: {}", path.display()));
            }
            config::load_from(path).map_err(|err| err.to_string())?
        }
        None => config::load_or_default().unwrap_or_else(|err| {
            eprintln!("Using default config: {err}");
            TrainConfig::default()
        }),
    };
    options.overrides.apply(&mut cfg);
    cfg.validate().map_err(|err| err.to_string())?;

    if let Some(path) = &options.write_config {
        config::save_to_path(&cfg, path).map_err(|err| err.to_string())?;
        println!("Wrote config to {}", path.display());
    }

    let table = load_table(&cfg.data_path, &cfg.load_options()).map_err(|err| err.to_string())?;
    println!(
        "Loaded {} rows from {}; training {} for {} steps",
        table.len(),
        cfg.data_path.display(),
        cfg.model,
        cfg.steps
    );

    let device = Default::default();
    let report = run_experiment::<TrainBackend>(&cfg, &table, &device, |estimate| {
        if !logging_active {
            println!("{estimate}");
        }
    })
    .map_err(|err| err.to_string())?;

    print_report(&report);
    if let Some(path) = &options.report_out {
        save_report(path, &report)?;
        println!("Wrote report to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &ExperimentReport) {
    let sweep = &report.sweep;
    println!("held-out row {}:", sweep.row);
    println!("  predicted: {:?}", sweep.predicted);
    println!("  actual:    {:?}", sweep.actual);
    println!(
        "  mean loss: {:.6} ({}/{} cells correct)",
        sweep.mean_loss,
        sweep.correct(),
        sweep.actual.len()
    );

    let held_out = &report.held_out;
    println!(
        "held-out accuracy: {:.4} over {} rows",
        held_out.accuracy, report.held_out_rows
    );
    for (idx, stats) in held_out.per_class.iter().enumerate() {
        println!(
            "class {idx} {:<8}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            stats.class_id, stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    let cm = &held_out.confusion;
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
}

fn save_report(path: &Path, report: &ExperimentReport) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create {}: {err}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(report)
        .map_err(|err| format!("Failed to serialize report: {err}"))?;
    std::fs::write(path, data).map_err(|err| format!("Failed to write {}: {err}", path.display()))
}

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    report_out: Option<PathBuf>,
    write_config: Option<PathBuf>,
    overrides: Overrides,
}

/// Flags that replace values from the config file.
#[derive(Debug, Default)]
struct Overrides {
    data_path: Option<PathBuf>,
    model: Option<ModelKind>,
    steps: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    eval_interval: Option<usize>,
    eval_iters: Option<usize>,
    hidden_size: Option<usize>,
    seed: Option<u64>,
    delimiter: Option<char>,
    header: Option<HeaderMode>,
    normalization: Option<NormalizationScope>,
    eval_row: Option<usize>,
}

impl Overrides {
    fn apply(&self, cfg: &mut TrainConfig) {
        if let Some(path) = &self.data_path {
            cfg.data_path = path.clone();
        }
        set(&mut cfg.model, self.model);
        set(&mut cfg.steps, self.steps);
        set(&mut cfg.batch_size, self.batch_size);
        set(&mut cfg.learning_rate, self.learning_rate);
        set(&mut cfg.eval_interval, self.eval_interval);
        set(&mut cfg.eval_iters, self.eval_iters);
        set(&mut cfg.hidden_size, self.hidden_size);
        set(&mut cfg.seed, self.seed);
        set(&mut cfg.delimiter, self.delimiter);
        set(&mut cfg.header, self.header);
        set(&mut cfg.normalization, self.normalization);
        set(&mut cfg.eval_row, self.eval_row);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let overrides = &mut options.overrides;

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--config" => options.config_path = Some(PathBuf::from(value_for(&args, &mut idx)?)),
            "--report" => options.report_out = Some(PathBuf::from(value_for(&args, &mut idx)?)),
            "--write-config" => {
                options.write_config = Some(PathBuf::from(value_for(&args, &mut idx)?));
            }
            "--data" => overrides.data_path = Some(PathBuf::from(value_for(&args, &mut idx)?)),
            "--model" => {
                let value = value_for(&args, &mut idx)?;
                overrides.model = Some(
                    ModelKind::parse(value)
                        .ok_or_else(|| format!("Invalid --model value: {value}"))?,
                );
            }
            "--steps" => overrides.steps = Some(parse_value(&args, &mut idx)?),
            "--batch" => overrides.batch_size = Some(parse_value(&args, &mut idx)?),
            "--learning-rate" => overrides.learning_rate = Some(parse_value(&args, &mut idx)?),
            "--eval-interval" => overrides.eval_interval = Some(parse_value(&args, &mut idx)?),
            "--eval-iters" => overrides.eval_iters = Some(parse_value(&args, &mut idx)?),
            "--hidden" => overrides.hidden_size = Some(parse_value(&args, &mut idx)?),
            "--seed" => overrides.seed = Some(parse_value(&args, &mut idx)?),
            "--eval-row" => overrides.eval_row = Some(parse_value(&args, &mut idx)?),
            "--delimiter" => {
                let value = value_for(&args, &mut idx)?;
                overrides.delimiter = Some(
                    parse_delimiter(value)
                        .ok_or_else(|| format!("Invalid --delimiter value: {value}"))?,
                );
            }
            "--header" => {
                let value = value_for(&args, &mut idx)?;
                overrides.header = Some(
                    HeaderMode::parse(value)
                        .ok_or_else(|| format!("Invalid --header value: {value}"))?,
                );
            }
            "--normalization" => {
                let value = value_for(&args, &mut idx)?;
                overrides.normalization = Some(
                    NormalizationScope::parse(value)
                        .ok_or_else(|| format!("Invalid --normalization value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

/// Advance past `args[*idx]` and return the value that follows it.
fn value_for<'a>(args: &'a [String], idx: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*idx];
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_value<T: FromStr>(args: &[String], idx: &mut usize) -> Result<T, String> {
    let flag = args[*idx].clone();
    let value = value_for(args, idx)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn parse_delimiter(value: &str) -> Option<char> {
    match value {
        "tab" | "\\t" => Some('\t'),
        "comma" => Some(','),
        "space" => Some(' '),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
    }
}

fn help_text() -> String {
    [
        "voltorb-train",
        "",
        "Trains a board predictor on a Voltorb Flip table and evaluates it on held-out boards.",
        "",
        "Usage:",
        "  voltorb-train [--config <file>] [--data <file>] [--model mlp|split|interaction]",
        "",
        "Options:",
        "  --config <file>          Load settings from a TOML file (default: app dir train.toml)",
        "  --data <file>            Training table (default: training_data.csv)",
        "  --model <kind>           mlp, split or interaction (default: interaction)",
        "  --steps <n>              Optimizer steps (default: 10000)",
        "  --batch <n>              Batch size (default: 8)",
        "  --learning-rate <f>      SGD learning rate (default: 0.01)",
        "  --eval-interval <n>      Steps between loss estimates (default: 1000)",
        "  --eval-iters <n>         Batches per loss estimate (default: 200)",
        "  --hidden <n>             Hidden layer width (default: 6000)",
        "  --seed <n>               Sampling seed (default: 1337)",
        "  --delimiter <d>          tab, comma, space or a single character (default: tab)",
        "  --header <mode>          auto, present or absent (default: auto)",
        "  --normalization <scope>  per_group or global (default: per_group)",
        "  --eval-row <n>           Held-out row swept after training (default: 0)",
        "  --report <file>          Write the run report as JSON",
        "  --write-config <file>    Write the resolved config as TOML",
    ]
    .join("\n")
}
