// src/main.rs
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

use finess_lib::matching::fuzzy::Strictness;
use finess_lib::matching::geo_index::GeographicIndex;
use finess_lib::models::{EstablishmentType, RunSummary};
use finess_lib::oracle::{OllamaClient, OracleAdapter, OracleConfig, RateLimiter};
use finess_lib::resolution::records::{reference_records, source_records};
use finess_lib::resolution::trace::write_traces;
use finess_lib::resolution::Resolver;
use finess_lib::storage::checkpoint::CsvCheckpointStore;
use finess_lib::storage::table::Table;
use finess_lib::utils::columns::ColumnMapping;
use finess_lib::utils::engine_config::{EngineConfig, ResumeMode};
use finess_lib::utils::env::load_env;
use finess_lib::utils::output_paths::{sample_path, timestamped_path, trace_path};
use finess_lib::utils::progress_bars::logging::{PipelineComponent, ResolutionLogger};
use finess_lib::utils::progress_bars::progress_config::ProgressConfig;
use finess_lib::utils::sampling::sample_rows;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Roster of establishments to identify
    #[arg(long)]
    source: PathBuf,

    /// FINESS reference registry
    #[arg(long)]
    reference: PathBuf,

    /// Where the augmented roster is written
    #[arg(long)]
    output: PathBuf,

    /// resume or restart
    #[arg(long)]
    mode: Option<ResumeMode>,

    /// very-strict, strict, normal, lenient or very-lenient
    #[arg(long)]
    strictness: Option<Strictness>,

    /// Skip the AI oracle entirely
    #[arg(long)]
    no_ai: bool,

    /// Persist a snapshot every N processed records
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    /// Field delimiter of every table
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Write to a fresh, timestamped copy of the output path
    #[arg(long)]
    timestamped_output: bool,

    /// Previous output to resume from, when it differs from the output path
    #[arg(long)]
    resume_from: Option<PathBuf>,

    /// Resolve only a random sample of N source rows
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for the sample draw
    #[arg(long)]
    seed: Option<u64>,

    /// Write a per-record decision trace next to the output
    #[arg(long)]
    trace: bool,

    /// Prefer registry entries of the same establishment type
    #[arg(long)]
    differentiate_types: bool,

    /// Treat every source row as this type (hospital or clinic)
    #[arg(long)]
    forced_type: Option<EstablishmentType>,
}

impl Args {
    fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(mode) = self.mode {
            config.resume_mode = mode;
        }
        if let Some(strictness) = self.strictness {
            config.strictness = strictness;
        }
        if self.no_ai {
            config.ai_enabled = false;
        }
        if let Some(interval) = self.checkpoint_interval {
            config.checkpoint_interval = interval;
        }
        if self.trace {
            config.trace_enabled = true;
        }
        if self.differentiate_types {
            config.differentiate_types = true;
        }
        if let Some(forced) = self.forced_type {
            config.differentiate_types = true;
            config.forced_type = Some(forced).filter(|t| *t != EstablishmentType::Unknown);
        }
    }

    fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("The delimiter must be a single ASCII character, got '{}'", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();
    info!("Starting FINESS identifier resolution");
    let start_time = Instant::now();

    let args = Args::parse();
    let mut config = EngineConfig::from_env();
    args.apply_to(&mut config);
    config.validate().context("Invalid engine configuration")?;
    config.log_config();

    let summary = run(&args, &config).await?;
    print_summary(&summary, start_time.elapsed());
    Ok(())
}

async fn run(args: &Args, config: &EngineConfig) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().to_string();
    let delimiter = args.delimiter_byte()?;
    let logger = ResolutionLogger::new(PipelineComponent::Index);

    let mut source = Table::read_csv(&args.source, delimiter)
        .with_context(|| format!("Failed to read the source roster {}", args.source.display()))?;
    logger.log_data_loaded(source.len(), "source");
    let reference = Table::read_csv(&args.reference, delimiter).with_context(|| {
        format!("Failed to read the reference registry {}", args.reference.display())
    })?;
    logger.log_data_loaded(reference.len(), "reference");

    let columns = ColumnMapping::from_env().resolve_against(&source.headers, &reference.headers)?;
    columns.log_config();

    let mut output = args.output.clone();
    let resume_from = if let Some(size) = args.sample {
        let (sampled, rows) = sample_rows(&source, size, args.seed);
        debug!("Sampled source rows: {:?}", rows);
        source = sampled;
        output = timestamped_path(&sample_path(&output, size), Local::now());
        if args.resume_from.is_some() {
            warn!("⚠️ Sample runs always start fresh; --resume-from is ignored");
        }
        None
    } else if args.timestamped_output {
        output = timestamped_path(&output, Local::now());
        args.resume_from.clone()
    } else {
        args.resume_from.clone().or_else(|| Some(output.clone()))
    };
    if config.resume_mode == ResumeMode::Restart && resume_from.is_some() {
        info!("🔁 Restart mode: previous results at the output path are ignored");
    }
    info!("📄 Output: {}", output.display());

    logger.log_phase("Index", Some("grouping the registry by department"));
    let (references, _) = reference_records(&reference, &columns);
    let index = GeographicIndex::build(&references);
    logger.log_index_built(index.len(), index.division_count(), index.undivided_count());
    if index.is_empty() {
        warn!("⚠️ The reference registry has no usable entries; every record will be unresolved");
    }

    let oracle = if config.ai_enabled {
        Some(connect_oracle(config).await?)
    } else {
        info!("🤖 AI oracle disabled; contested candidates will be reported as ambiguous");
        None
    };

    let mut records = source_records(&source, &columns);
    let mut store = CsvCheckpointStore::new(&output, delimiter).with_resume_source(resume_from);
    let progress = ProgressConfig::from_env();
    let mut resolver = Resolver::new(config, &index, oracle).with_progress(
        progress.create_bar(records.len()),
        progress.should_show_stage_counts(),
    );

    let summary = resolver
        .run(&run_id, &source, &mut records, &columns.output, &mut store)
        .await?;
    info!("💾 Results written to {}", store.destination().display());

    if config.trace_enabled {
        let path = trace_path(&output);
        write_traces(&path, &resolver.take_traces())?;
        info!("🧾 Decision trace written to {}", path.display());
    }
    Ok(summary)
}

async fn connect_oracle(config: &EngineConfig) -> Result<OracleAdapter> {
    let logger = ResolutionLogger::new(PipelineComponent::Oracle);
    logger.log_phase("Connect", Some("checking the Ollama server"));
    let oracle_config = OracleConfig::from_env();
    oracle_config.log_config();
    let max_attempts = oracle_config.max_attempts;
    let client = OllamaClient::new(oracle_config)?;
    if let Err(e) = client.test_connection().await {
        logger.log_error(&format!("{:#}", e));
        return Err(e.context("The AI oracle is unreachable; start the Ollama server or run with --no-ai"));
    }
    info!("✅ AI oracle reachable, model {}", client.config().model);

    let limiter = RateLimiter::new(config.ai_max_requests, Duration::from_secs(config.ai_window_secs));
    debug!(
        "Oracle calls limited to {} per {}s",
        limiter.max_requests(),
        limiter.window().as_secs()
    );
    Ok(OracleAdapter::new(Box::new(client), limiter, config.ai_coherence_check)
        .with_max_attempts(max_attempts))
}

fn print_summary(summary: &RunSummary, elapsed: Duration) {
    println!("\n=== Resolution Summary ===");
    println!("Run ID: {}", summary.run_id);
    println!("Records: {}", summary.total_records);
    println!("Restored from a previous run: {}", summary.skipped_existing);
    println!("Processed this run: {}", summary.processed);
    println!("  Resolved: {}", summary.resolved);
    println!("  Ambiguous: {}", summary.ambiguous);
    println!("  Unresolved: {}", summary.unresolved);
    for (stage, count) in &summary.stage_counts {
        println!("    {}: {}", stage.label(), count);
    }
    for (tier, count) in &summary.tier_counts {
        println!("  Decided at {}: {}", tier, count);
    }
    println!("Resolution rate: {:.1}%", summary.resolution_rate());
    println!("AI oracle calls: {}", summary.oracle_calls);
    println!(
        "Checkpoints: {} written, {} failed",
        summary.checkpoints_written, summary.checkpoint_failures
    );
    println!("Total time: {:.2?}", elapsed);
}
