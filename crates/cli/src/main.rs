use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use logwarden_pipeline::{
    discover_log_files, export_records, Pipeline, RunLock, Settings, StatePaths,
};
use logwarden_vector_store::FlatL2Index;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logwarden")]
#[command(about = "Incremental security triage for web server logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail, triage and analyze everything appended since the last run
    Run(RunArgs),

    /// Validate configuration and report persisted state
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Directory scanned for .log/.gz/.bz2 files (overrides LOGWARDEN_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// NDJSON output file (overrides LOGWARDEN_OUTPUT_FILE)
    #[arg(long)]
    output: Option<PathBuf>,

    /// State directory (overrides LOGWARDEN_STATE_DIR)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Hourly reasoning budget in USD (overrides LOGWARDEN_MAX_HOURLY_COST_USD)
    #[arg(long)]
    budget: Option<f64>,
}

#[derive(Args)]
struct CheckArgs {
    /// State directory (overrides LOGWARDEN_STATE_DIR)
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Run(args) => run_pipeline(args).await?,
        Commands::Check(args) => run_check(args).await?,
    }

    Ok(())
}

async fn run_pipeline(args: RunArgs) -> Result<()> {
    let mut settings = Settings::from_env().context("failed to load configuration")?;
    if let Some(dir) = args.log_dir {
        settings.log_dir = dir;
    }
    if let Some(output) = args.output {
        settings.output_file = output;
    }
    if let Some(dir) = args.state_dir {
        settings.state_dir = dir;
    }
    if let Some(budget) = args.budget {
        settings.max_hourly_cost_usd = budget;
    }
    settings.validate().context("invalid configuration")?;

    log::info!("log directory: {}", settings.log_dir.display());
    log::info!("output file: {}", settings.output_file.display());
    log::info!("state directory: {}", settings.state_dir.display());

    let paths = StatePaths::in_dir(&settings.state_dir);
    let _lock = RunLock::acquire(&paths.lock)
        .await
        .context("failed to acquire the run lock")?;

    let mut pipeline = Pipeline::open(&settings)
        .await
        .context("failed to assemble the pipeline")?;

    let files = discover_log_files(&settings.log_dir);
    if files.is_empty() {
        log::info!("no log files found in {}", settings.log_dir.display());
    } else {
        log::info!("processing {} log files", files.len());
    }

    let outcome = pipeline.run(&files).await;

    // State is saved regardless of how the run went, so partial progress
    // survives a failed stage.
    let persisted = pipeline.persist_state().await;

    let records = outcome.context("pipeline run failed")?;
    export_records(&settings.output_file, &records)
        .await
        .context("failed to export analysis records")?;
    persisted.context("failed to persist state")?;

    let usage = pipeline.lifetime_usage();
    log::info!(
        "lifetime usage: {} input tokens, {} output tokens, ${:.4}",
        usage.input_tokens,
        usage.output_tokens,
        usage.cost_usd
    );
    Ok(())
}

async fn run_check(args: CheckArgs) -> Result<()> {
    let mut settings = Settings::from_env().context("failed to load configuration")?;
    if let Some(dir) = args.state_dir {
        settings.state_dir = dir;
    }
    settings.validate().context("invalid configuration")?;

    eprintln!("Configuration: ok");
    eprintln!("Log directory: {}", settings.log_dir.display());
    eprintln!("Output file: {}", settings.output_file.display());
    eprintln!("State directory: {}", settings.state_dir.display());
    eprintln!(
        "Analysis: {}",
        if settings.gemini_api_key.is_some() {
            "enabled"
        } else {
            "disabled (no API key)"
        }
    );
    eprintln!(
        "Indexing: {}",
        if !settings.indexing_enabled {
            "disabled"
        } else if settings.embeddings_url.is_some() {
            "remote embeddings"
        } else {
            "hash vectors"
        }
    );

    let paths = StatePaths::in_dir(&settings.state_dir);
    for (label, path) in [
        ("Cursors", &paths.cursors),
        ("Verdict cache", &paths.verdict_cache),
        ("Usage", &paths.usage),
    ] {
        match tokio::fs::metadata(path).await {
            Ok(meta) => eprintln!("{label}: {} ({} bytes)", path.display(), meta.len()),
            Err(_) => eprintln!("{label}: {} (absent)", path.display()),
        }
    }

    let index = FlatL2Index::open(&paths.vectors, settings.embedding_dimension).await;
    eprintln!(
        "Vector index: {} vectors (dimension {})",
        index.len(),
        index.dimension()
    );
    Ok(())
}
