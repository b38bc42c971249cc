//! brent-changepoint CLI: prepare data, fit the change-point model, summarize
//! and report.

use brent_changepoint::changepoint::{ChangePointModel, InferenceResult, PosteriorSummarizer};
use brent_changepoint::config::{ProjectPaths, RunConfig};
use brent_changepoint::ingest::{load_key_events, load_processed_csv, prepare_data, write_processed_csv};
use brent_changepoint::report::{event_records, AnalysisReport, PriceData};
use brent_changepoint::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "brent-changepoint")]
#[command(about = "Bayesian change-point analysis of monthly Brent oil prices")]
#[command(version)]
struct Cli {
    /// Project root containing data/, reports/ and logs/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write logs to this file (fit defaults to logs/modeling.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample raw daily prices into the processed monthly CSV
    Prepare,

    /// Sample the posterior and persist the trace
    Fit {
        /// Draws retained per chain
        #[arg(long)]
        samples: Option<usize>,

        /// Number of chains
        #[arg(long)]
        chains: Option<usize>,

        /// Tuning iterations per chain
        #[arg(long)]
        tune: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the change-point estimate as JSON
    Summarize,

    /// Print dashboard payloads and the event analysis as JSON
    Report {
        /// Where to write the report (defaults to reports/change_point_analysis.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let paths = ProjectPaths::from_root(&cli.root);

    let log_file = match (&cli.log_file, &cli.command) {
        (Some(path), _) => Some(path.clone()),
        (None, Commands::Fit { .. }) => Some(paths.modeling_log()),
        _ => None,
    };
    if let Err(e) = init_logging(log_file.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Prepare => cmd_prepare(&paths),
        Commands::Fit {
            samples,
            chains,
            tune,
            seed,
        } => {
            let mut config = config;
            if let Some(n) = samples {
                config.sampler.num_samples = n;
            }
            if let Some(n) = chains {
                config.sampler.num_chains = n;
            }
            if let Some(n) = tune {
                config.sampler.tuning_steps = n;
            }
            if let Some(s) = seed {
                config.sampler.random_seed = s;
            }
            cmd_fit(&paths, &config)
        }
        Commands::Summarize => cmd_summarize(&paths, &config),
        Commands::Report { output } => cmd_report(&paths, &config, output.as_deref()),
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_prepare(paths: &ProjectPaths) -> Result<()> {
    let (series, events) = prepare_data(&paths.raw_prices, &paths.events)?;
    write_processed_csv(&series, &paths.processed)?;
    println!(
        "Prepared {} months and {} events -> {}",
        series.len(),
        events.len(),
        paths.processed.display()
    );
    Ok(())
}

fn cmd_fit(paths: &ProjectPaths, config: &RunConfig) -> Result<()> {
    let series = load_processed_csv(&paths.processed)?;
    config.validate()?;

    let model = ChangePointModel::new(config.priors);
    let result = model.fit(&series, &config.sampler)?;

    if let Some(parent) = paths.trace.parent() {
        std::fs::create_dir_all(parent)?;
    }
    result.write_json(&paths.trace)?;

    let table = result.summary_table(config.summary.credible_mass);
    tracing::info!("model inference summary\n{table}");
    println!("{table}");
    println!("Trace saved to {}", paths.trace.display());
    Ok(())
}

fn cmd_summarize(paths: &ProjectPaths, config: &RunConfig) -> Result<()> {
    let series = load_processed_csv(&paths.processed)?;
    let result = InferenceResult::read_json(&paths.trace)?;
    let estimate = PosteriorSummarizer::new(config.summary)?.summarize(&result, &series)?;
    tracing::info!(
        tau = estimate.most_probable_tau,
        date = %estimate.change_point_date,
        converged = estimate.converged,
        "change point estimated"
    );
    print_json(&estimate)
}

#[derive(Serialize)]
struct ReportPayload {
    data: PriceData,
    events: Vec<brent_changepoint::report::EventRecord>,
    analysis: AnalysisReport,
}

fn cmd_report(paths: &ProjectPaths, config: &RunConfig, output: Option<&Path>) -> Result<()> {
    let series = load_processed_csv(&paths.processed)?;
    let events = load_key_events(&paths.events)?;
    let result = InferenceResult::read_json(&paths.trace)?;
    let estimate = PosteriorSummarizer::new(config.summary)?.summarize(&result, &series)?;

    let payload = ReportPayload {
        data: PriceData::new(&series, Some(&estimate)),
        events: event_records(&events),
        analysis: AnalysisReport::new(estimate, &events, config.report.event_window_months),
    };

    if let Some(closest) = payload.analysis.closest_event() {
        tracing::info!(
            event = %closest.event,
            months = closest.months_from_change,
            "closest key event to the change point"
        );
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.reports.join("change_point_analysis.json"));
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, serde_json::to_string_pretty(&payload)?)?;
    tracing::info!(path = %output.display(), "report written");

    print_json(&payload)
}
