//! Cane strategy CLI
//!
//! Generates synthetic harvest data, trains and evaluates profit models,
//! predicts single scenarios and runs the sugar vs ethanol decision engine.

use anyhow::{bail, Context, Result};
use cane_core::config::CaneConfig;
use cane_core::model::ModelKind;
use cane_core::{recommend_from_map, Predictor, Scenario, SyntheticGenerator};
use cane_trainer::{evaluate_with_seed, TrainingJobs, TrainingRequest, TrainingTarget};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "cane")]
#[command(author = "Cane Strategy Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sugar vs ethanol production strategy tools", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a synthetic dataset as CSV
    Generate {
        /// Number of rows
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Base seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a profit model and save it
    Train {
        /// Target profit: sugar or ethanol
        #[arg(short, long, default_value = "sugar")]
        target: TrainingTarget,

        /// Model kind: random_forest, gradient_boosting or linear
        #[arg(short, long)]
        model: Option<ModelKind>,

        /// Number of generated samples
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Minimum samples per leaf
        #[arg(long)]
        min_samples_leaf: Option<usize>,

        /// Boosting learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Seed for generation, splitting and bootstrapping
        #[arg(long)]
        seed: Option<u64>,

        /// Artifact path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Predict one scenario with a saved model
    Predict {
        /// Artifact path
        #[arg(short, long)]
        model: PathBuf,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Score a saved model on freshly generated data
    Evaluate {
        /// Artifact path
        #[arg(short, long)]
        model: PathBuf,

        /// Target profit: sugar or ethanol
        #[arg(short, long, default_value = "sugar")]
        target: TrainingTarget,

        /// Number of generated samples
        #[arg(short = 'n', long, default_value = "1000")]
        samples: usize,

        /// Evaluation seed
        #[arg(long, default_value_t = cane_trainer::trainer::EVALUATION_SEED)]
        seed: u64,
    },

    /// Recommend sugar, ethanol or a mixed strategy
    Recommend {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

/// Named numeric inputs from a JSON object file and/or `name=value` pairs
#[derive(Args, Debug)]
struct InputArgs {
    /// JSON file with an object of name to number
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Individual `name=value` inputs, applied after the file
    #[arg(short, long = "set", value_parser = parse_assignment)]
    set: Vec<(String, f64)>,
}

impl InputArgs {
    fn scenario(&self) -> Result<Scenario> {
        let mut scenario = match &self.input {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<Scenario>(&content)
                    .with_context(|| format!("{} is not a JSON object of numbers", path.display()))?
            }
            None => Scenario::new(),
        };
        for (name, value) in &self.set {
            scenario.set(name.clone(), *value);
        }
        if scenario.is_empty() {
            bail!("no inputs given; use --input or --set name=value");
        }
        Ok(scenario)
    }
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{}`", raw))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", value.trim()))?;
    Ok((name.trim().to_string(), value))
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CaneConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    init_tracing(level)?;

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Command::Generate {
            samples,
            seed,
            output,
        } => {
            let samples = samples.unwrap_or(config.generator.num_samples);
            let seed = seed.unwrap_or(config.generator.seed);
            run_generate(samples, seed, output.as_deref())
        }
        Command::Train {
            target,
            model,
            samples,
            trees,
            max_depth,
            min_samples_leaf,
            learning_rate,
            seed,
            output,
        } => {
            let mut request = TrainingRequest::from_config(&config, target);
            if let Some(kind) = model {
                request.model_kind = kind;
                request.model_path = Some(config.model_path(target.file_stem(), kind));
            }
            if let Some(samples) = samples {
                request.num_samples = samples;
            }
            let params = &mut request.params;
            params.n_estimators = trees.unwrap_or(params.n_estimators);
            params.max_depth = max_depth.unwrap_or(params.max_depth);
            params.min_samples_leaf = min_samples_leaf.unwrap_or(params.min_samples_leaf);
            params.learning_rate = learning_rate.unwrap_or(params.learning_rate);
            params.seed = seed.unwrap_or(params.seed);
            if output.is_some() {
                request.model_path = output;
            }
            run_train(request).await
        }
        Command::Predict { model, inputs } => {
            let scenario = inputs.scenario()?;
            let mut predictor = Predictor::new(&model);
            let prediction = predictor
                .predict(&scenario)
                .with_context(|| format!("Prediction with {} failed", model.display()))?;
            let target = predictor.artifact()?.target.clone();

            #[derive(Serialize)]
            struct PredictionOutput {
                model_path: PathBuf,
                target: String,
                prediction: f64,
            }
            print_json(&PredictionOutput {
                model_path: model,
                target,
                prediction,
            })
        }
        Command::Evaluate {
            model,
            target,
            samples,
            seed,
        } => {
            let mut predictor = Predictor::new(&model);
            let metrics = evaluate_with_seed(&mut predictor, target, samples, seed)
                .with_context(|| format!("Evaluation of {} failed", model.display()))?;
            print_json(&metrics)
        }
        Command::Recommend { inputs } => {
            let conditions = inputs.scenario()?;
            let decision = recommend_from_map(&conditions).context("Invalid production conditions")?;
            info!(
                recommendation = %decision.recommendation,
                confidence = decision.confidence,
                "Decision computed"
            );
            print_json(&decision)
        }
    }
}

fn run_generate(samples: usize, seed: u64, output: Option<&Path>) -> Result<()> {
    let dataset = SyntheticGenerator::new(seed)
        .generate(samples)
        .context("Failed to generate dataset")?;

    let (sugar, ethanol, mixed) = dataset.strategy_counts();
    info!("Generated {} samples with seed {}", dataset.len(), seed);
    info!("  sugar: {}, ethanol: {}, mixed: {}", sugar, ethanol, mixed);

    match output {
        Some(path) => {
            dataset
                .to_csv_file(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Dataset written to: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            dataset.write_csv(&mut lock).context("Failed to write CSV")?;
            lock.flush()?;
        }
    }
    Ok(())
}

async fn run_train(request: TrainingRequest) -> Result<()> {
    info!("Cane profit trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");
    info!("Training configuration:");
    info!("  Target: {}", request.target);
    info!("  Model: {}", request.model_kind);
    info!("  Samples: {}", request.num_samples);
    info!("  Trees: {}", request.params.n_estimators);
    info!("  Max depth: {}", request.params.max_depth);
    info!("  Min samples per leaf: {}", request.params.min_samples_leaf);
    info!("  Seed: {}", request.params.seed);
    info!("═══════════════════════════════════════════");

    let jobs = TrainingJobs::new();
    let id = jobs.submit(request).context("Failed to submit training job")?;
    info!("Started job {}", id);
    let metrics = jobs.wait(id).await.context("Training failed")?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    info!("  Model: {}", metrics.model_path.display());
    info!("  R² test: {:.4} (train {:.4})", metrics.r2_test, metrics.r2_train);
    info!("  Hash: {}", metrics.model_hash);

    print_json(&metrics)
}
