use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vbench_core::{BenchmarkRunner, ComposeLifecycle, Config, Dataset, Registry, Selection};

#[derive(Parser)]
#[command(name = "vbench")]
#[command(about = "Vector database benchmark harness", long_about = None)]
struct Cli {
    /// Path to configuration file (built-in defaults when absent)
    #[arg(short, long, default_value = "vbench.yaml")]
    config: PathBuf,

    /// Comma separated list of backends to run, or 'all'
    #[arg(long, default_value = "all")]
    db: String,

    /// Path to dataset (overrides config)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Seed dataset used to synthesize the default dataset (overrides config)
    #[arg(long)]
    seed_data: Option<PathBuf>,

    /// Where to write the metrics report (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of timed search trials per backend
    #[arg(long)]
    trials: Option<usize>,

    /// Top-k for each search
    #[arg(long)]
    limit: Option<usize>,

    /// Readiness probe attempts before a backend times out
    #[arg(long)]
    ready_attempts: Option<u32>,

    /// Delay between readiness probes in milliseconds
    #[arg(long)]
    ready_interval_ms: Option<u64>,

    /// List registered backends and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let registry = Registry::from_config(&config);

    if cli.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let dataset = load_dataset(&config)?;
    eprintln!(
        "Loaded {} items (dimension {})",
        dataset.len(),
        dataset.dimension()
    );

    let lifecycle = ComposeLifecycle::new(&config.compose);
    let runner = BenchmarkRunner::new(registry, Box::new(lifecycle), config.benchmark.clone());

    let selection = Selection::parse(&cli.db);
    let report = runner.run(&selection, &dataset).await;

    report
        .write_to(&config.output)
        .with_context(|| format!("writing report to {}", config.output.display()))?;

    let summary = report.summary();
    for record in report.records() {
        match &record.error {
            None => eprintln!(
                "  {:<16} success  avg {:.2}ms  p99 {:.2}ms",
                record.name,
                record.search_avg_latency.unwrap_or_default() * 1000.0,
                record.search_p99_latency.unwrap_or_default() * 1000.0,
            ),
            Some(cause) => eprintln!("  {:<16} failed   {}", record.name, cause),
        }
    }
    eprintln!(
        "Processed {} backends ({} succeeded, {} failed)",
        summary.total, summary.succeeded, summary.failed
    );
    eprintln!("Metrics saved to {}", config.output.display());
    Ok(())
}

/// Read the config file if present, then apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading configuration");
        Config::from_file(&cli.config)
            .with_context(|| format!("loading config {}", cli.config.display()))?
    } else if cli.config != Path::new("vbench.yaml") {
        return Err(anyhow!("Config file not found: {}", cli.config.display()));
    } else {
        Config::default()
    };

    if let Some(data) = &cli.data {
        config.dataset.path = data.clone();
    }
    if let Some(seed) = &cli.seed_data {
        config.dataset.seed = seed.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(trials) = cli.trials {
        config.benchmark.search_trials = trials;
    }
    if let Some(limit) = cli.limit {
        config.benchmark.search_limit = limit;
    }
    if let Some(attempts) = cli.ready_attempts {
        config.benchmark.ready_attempts = attempts;
    }
    if let Some(interval) = cli.ready_interval_ms {
        config.benchmark.ready_interval_ms = interval;
    }

    config.validate()?;
    Ok(config)
}

/// Load the dataset, synthesizing the default one from its seed when missing
fn load_dataset(config: &Config) -> Result<Dataset> {
    let path = &config.dataset.path;

    if !path.exists() && config.dataset.is_default_path() {
        eprintln!("Generating data...");
        let dataset = Dataset::synthesize_file(
            &config.dataset.seed,
            path,
            config.dataset.synthesize_count,
        )
        .with_context(|| {
            format!(
                "synthesizing {} from {}",
                path.display(),
                config.dataset.seed.display()
            )
        })?;
        return Ok(dataset);
    }

    if !path.exists() {
        return Err(anyhow!("Data file {} not found", path.display()));
    }

    Dataset::from_file(path).with_context(|| format!("loading dataset {}", path.display()))
}
