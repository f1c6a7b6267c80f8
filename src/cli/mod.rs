//! Store Sales CLI Module
//!
//! Command-line interface for batch prediction and per-store forecasts.
//! Status lines go to stderr so JSON on stdout can be piped.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::summarize_by_store;
use crate::pipeline::{Forecast, PipelineConfig, SalesPipeline};
use crate::preprocessing::{RescaleMode, TransformId, FEATURE_NAMES};
use crate::record::InputBatch;
use crate::utils::{RecordSource, StoreDataset};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    eprint!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    eprintln!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    eprintln!();
    eprintln!("  {}", title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    eprintln!("  {:<24} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "store-sales")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily store sales prediction from a trained gradient-boosted model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command; they override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory of the transform artifacts
    #[arg(long, global = true)]
    pub artifacts: Option<PathBuf>,

    /// XGBoost model file (JSON)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Refit transforms on every batch instead of applying stored parameters
    #[arg(long, global = true)]
    pub refit: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict a batch of records
    Predict {
        /// Input records: a JSON object or array of objects
        #[arg(short, long)]
        input: PathBuf,

        /// Write predictions here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Forecast one store from the reference data
    Forecast {
        /// Store number (a leading `/` is accepted)
        #[arg(short, long, value_parser = parse_store_id)]
        store: i64,

        /// Daily schedule CSV
        #[arg(long, default_value = "stores_info/test.csv")]
        test: PathBuf,

        /// Store master data CSV
        #[arg(long, default_value = "stores_info/store.csv")]
        stores: PathBuf,
    },

    /// Show the loaded artifacts
    Info,
}

/// `22`, ` 22 ` and `/22` all name store 22
pub fn parse_store_id(text: &str) -> Result<i64, String> {
    let cleaned = text.trim().replace('/', "");
    cleaned
        .parse::<i64>()
        .map_err(|_| format!("{:?} is not a store number", text))
}

/// Resolve the pipeline configuration: file first, then flag overrides
pub fn build_config(args: &GlobalArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if args.refit {
        config.rescale_mode = RescaleMode::Refit;
    }
    Ok(config)
}

fn load_pipeline(args: &GlobalArgs) -> anyhow::Result<SalesPipeline> {
    let config = build_config(args)?;
    step_run("Loading artifacts");
    let start = Instant::now();
    let pipeline = SalesPipeline::load(config)?;
    step_done(&format!("{:?}", start.elapsed()));
    Ok(pipeline)
}

fn report_empty(forecast: &Forecast) {
    match forecast {
        Forecast::NoInput => eprintln!("  {}", "No records in input".yellow()),
        Forecast::NoPredictableRecords => eprintln!("  {}", "No open-store records to predict".yellow()),
        Forecast::Predicted(_) => {}
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_predict(args: &GlobalArgs, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");
    let pipeline = load_pipeline(args)?;

    step_run("Reading records");
    let json = std::fs::read_to_string(input)?;
    let batch = InputBatch::from_json_str(&json)?;
    step_done(&format!("{} records", batch.len()));

    step_run("Predicting");
    let start = Instant::now();
    let forecast = pipeline.predict(&batch)?;
    step_done(&format!("{} predictions in {:?}", forecast.records().len(), start.elapsed()));
    report_empty(&forecast);

    let out = serde_json::to_string_pretty(&forecast.to_json()?)?;
    match output {
        Some(path) => {
            std::fs::write(path, out)?;
            eprintln!("  {} {}", ok("✓"), format!("Wrote {}", path.display()));
        }
        None => println!("{}", out),
    }
    eprintln!();
    Ok(())
}

pub fn cmd_forecast(args: &GlobalArgs, store: i64, test: &Path, stores: &Path) -> anyhow::Result<()> {
    section("Forecast");
    let pipeline = load_pipeline(args)?;

    step_run("Loading reference data");
    let dataset = StoreDataset::from_csv(test, stores)?;
    step_done(&format!("{} rows", dataset.len()));

    let records = dataset.records_for_store(store)?;
    let forecast = pipeline.predict_json(&records)?;
    report_empty(&forecast);

    for summary in summarize_by_store(forecast.records()) {
        eprintln!();
        println!("  {}", summary.to_string().white().bold());
        kv("Days predicted", &summary.days.to_string());
    }
    eprintln!();
    Ok(())
}

pub fn cmd_info(args: &GlobalArgs) -> anyhow::Result<()> {
    let pipeline = load_pipeline(args)?;
    let config = pipeline.config();

    section("Pipeline");
    kv("Artifacts", &config.artifact_dir.display().to_string());
    kv("Model", &config.model_path.display().to_string());
    kv("Rescale mode", &format!("{:?}", config.rescale_mode));
    kv(
        "Distance fallback",
        &config
            .competition_distance_fallback
            .map_or_else(|| "none".to_string(), |d| d.to_string()),
    );

    section("Transforms");
    let bank = pipeline.bank();
    for id in TransformId::ALL {
        let detail = match bank.rescaler(id) {
            Ok(rescaler) => format!("{:?}", rescaler),
            Err(_) => format!("label {:?}", bank.store_type_encoder().classes()),
        };
        kv(id.field(), &detail);
    }

    section("Model");
    let model = pipeline.model();
    kv("Features", &model.n_features().to_string());
    kv(
        "Stored feature names",
        if model.feature_names().is_some() { "yes" } else { "no" },
    );
    eprintln!("  {}", dim(&FEATURE_NAMES.join(", ")));
    eprintln!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_id() {
        assert_eq!(parse_store_id("22"), Ok(22));
        assert_eq!(parse_store_id(" /22 "), Ok(22));
        assert!(parse_store_id("store").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = GlobalArgs {
            config: None,
            artifacts: Some(PathBuf::from("/srv/rescaling")),
            model: None,
            refit: true,
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/rescaling"));
        assert_eq!(config.model_path, PipelineConfig::default().model_path);
        assert_eq!(config.rescale_mode, RescaleMode::Refit);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["store-sales", "--refit", "forecast", "--store", "/7"]).unwrap();
        assert!(cli.global.refit);
        match cli.command {
            Commands::Forecast { store, .. } => assert_eq!(store, 7),
            _ => panic!("expected forecast"),
        }
    }
}
