//! Job Aggregator CLI
//!
//! Local execution entry point backed by JSON-file storage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use job_aggregator::{
    adapters::AdapterRegistry,
    error::Result,
    models::{Config, RunParams, Session, SourceId},
    pipeline::{LogReporter, Orchestrator, ProgressReporter, RunService, RunSummary, TaskState},
    storage::LocalStorage,
    utils::log as console,
};
use uuid::Uuid;

/// Job Aggregator - collects postings from job boards and search APIs
#[derive(Parser, Debug)]
#[command(
    name = "aggregator",
    version,
    about = "Aggregates and deduplicates job postings"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Path to the storage directory
    #[arg(short, long, default_value = "storage")]
    storage: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an aggregation across the active sources
    Run {
        /// Search keywords
        query: String,

        /// Location filter
        #[arg(short, long, default_value = "")]
        location: String,

        /// Record budget per source
        #[arg(short, long, default_value_t = 25)]
        max_results: usize,

        /// Restrict the run to these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<SourceId>,

        /// Run as a background task with retry and streamed progress
        #[arg(long)]
        background: bool,
    },

    /// List configured sources and their fallback chains
    Sources,

    /// Show a session with its errors and logs
    Session { id: Uuid },

    /// Start a new run with the parameters of a failed or cancelled session
    Retry { id: Uuid },

    /// Delete old sessions
    Cleanup {
        /// Age in days (default: pipeline.session_retention_days)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Mark stale postings expired
    Expire {
        /// Age in days (default: pipeline.posting_expiry_days)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging; `--verbose` wins over the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_summary(summary: &RunSummary) {
    console::summary("Run", &summary.items());
}

fn print_session(session: &Session) {
    console::header(&format!("Session {}", session.id));
    let duration = session
        .duration()
        .map(|d| format!("{}s", d.num_seconds()))
        .unwrap_or_else(|| "-".to_string());
    console::summary(
        "Session",
        &[
            ("query", session.params.query.clone()),
            ("location", session.params.location.clone()),
            ("max results", session.params.max_results.to_string()),
            ("status", session.status.to_string()),
            ("found", session.counters.found.to_string()),
            ("processed", session.counters.processed.to_string()),
            ("created", session.counters.created.to_string()),
            ("updated", session.counters.updated.to_string()),
            ("errors", session.counters.errors.to_string()),
            ("duplicates merged", session.counters.duplicates_merged.to_string()),
            ("duration", duration),
            ("success rate", format!("{:.0}%", session.success_rate() * 100.0)),
        ],
    );

    if !session.errors.is_empty() {
        console::separator();
        log::info!("Errors ({})", session.errors.len());
        for error in &session.errors {
            let source = error.source.map(|s| s.as_str()).unwrap_or("run");
            match &error.url {
                Some(url) => console::sub_item(&format!(
                    "[{}] {}: {} ({})",
                    error.kind, source, error.message, url
                )),
                None => console::sub_item(&format!("[{}] {}: {}", error.kind, source, error.message)),
            }
        }
    }

    if !session.logs.is_empty() {
        console::separator();
        log::info!("Logs ({})", session.logs.len());
        for entry in &session.logs {
            let source = entry.source.map(|s| s.as_str()).unwrap_or("run");
            console::sub_item(&format!("[{}] {}: {}", entry.level, source, entry.message));
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = Config::load(&cli.config);
    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => "info".to_string(),
    };
    init_logging(cli.verbose, &level);

    let config = match loaded {
        Ok(config) => {
            log::debug!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default().with_env()
        }
    };

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        let active = config.active_sources(None);
        log::info!(
            "✓ Config OK ({} sources, {} active)",
            config.sources.len(),
            active.len()
        );
        if !config.adzuna.is_configured() {
            log::warn!("Adzuna credentials are not set; the Adzuna adapter will fail");
        }
        return Ok(());
    }

    config.validate()?;
    let config = Arc::new(config);
    let storage = Arc::new(LocalStorage::open(&cli.storage).await?);
    let registry = Arc::new(AdapterRegistry::from_config(&config));
    let service = RunService::new(Orchestrator::new(
        Arc::clone(&config),
        registry,
        storage.clone(),
        storage.clone(),
    ));

    match cli.command {
        Command::Run {
            query,
            location,
            max_results,
            sources,
            background,
        } => {
            let sources = (!sources.is_empty()).then_some(sources);
            console::header(&format!("Aggregating '{}'", query));

            if background {
                let mut params = RunParams::new(query, location, max_results);
                if let Some(sources) = sources {
                    params = params.with_sources(sources);
                }
                let mut handle = service.submit(params).await?;
                log::info!("Submitted session {}", handle.session_id());

                while let Some(update) = handle.progress().recv().await {
                    LogReporter.report(update.session_id, update.event);
                }
                match handle.wait().await {
                    TaskState::Succeeded(summary) => print_summary(&summary),
                    TaskState::Failed { attempts, message } => {
                        log::error!("Run failed after {} attempt(s): {}", attempts, message);
                    }
                    state => log::warn!("Run ended in state {}", state.label()),
                }
            } else {
                let summary = service
                    .start_run(&query, &location, max_results, sources)
                    .await?;
                print_summary(&summary);
            }
        }

        Command::Sources => {
            let registry = AdapterRegistry::from_config(&config);
            console::header("Sources (chains as planned for a Kenya location)");
            for source in &config.sources {
                let steps = registry
                    .chain(source.id)
                    .map(|chain| {
                        chain
                            .plan("kenya")
                            .iter()
                            .map(|(step, adapter)| format!("{}:{}", step, adapter.name()))
                            .collect::<Vec<_>>()
                            .join(" -> ")
                    })
                    .unwrap_or_default();
                console::sub_item(&format!(
                    "{:<15} {:<8} {} [{}]",
                    source.id.as_str(),
                    if source.active { "active" } else { "inactive" },
                    source.base_url,
                    steps
                ));
            }
            if config.pipeline.placeholder_enabled {
                log::info!(
                    "Placeholder fallback enabled (limit {})",
                    config.pipeline.placeholder_limit
                );
            }
        }

        Command::Session { id } => {
            let session = service.get_session(id).await?;
            print_session(&session);
        }

        Command::Retry { id } => {
            let summary = service.retry_run(id).await?;
            print_summary(&summary);
        }

        Command::Cleanup { days } => {
            let days = days.unwrap_or(config.pipeline.session_retention_days);
            let removed = service.cleanup_sessions_older_than(days).await?;
            log::info!("Removed {} sessions older than {} days", removed, days);
        }

        Command::Expire { days } => {
            let days = days.unwrap_or(config.pipeline.posting_expiry_days);
            let expired = service.expire_stale_postings(days).await?;
            log::info!("Expired {} postings older than {} days", expired, days);
        }

        Command::Validate => {}
    }

    log::info!("Done!");

    Ok(())
}
