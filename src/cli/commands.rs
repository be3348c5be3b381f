//! CLI command definitions for docforge.
//!
//! `run` drives the batch generation pipeline; `status` inspects the
//! progress snapshot and record catalog without generating anything.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::catalog;
use crate::llm::{GenerationClient, OpenRouterClient, StubClient};
use crate::pipeline::{
    LifecycleController, PipelineConfig, PipelineExecutor, RunReport, TaskMatrixBuilder,
};
use crate::store::{ProgressStore, SqliteRecordStore};

/// Default record database path.
const DEFAULT_RECORDS_DB: &str = "docforge_records.db";

/// Default progress snapshot path.
const DEFAULT_PROGRESS_FILE: &str = "docforge_progress.json";

/// Batch document generator for project/template catalogs.
#[derive(Parser)]
#[command(name = "docforge")]
#[command(about = "Generate structured project documents from template catalogs")]
#[command(version)]
#[command(
    long_about = "docforge drives the cross product of a project catalog and a template catalog \
through multi-stage LLM generation, persisting one record per completed pair.\n\nRuns are \
checkpointed: interrupt with ctrl-c and re-run to resume where the previous run left off.\n\n\
Example usage:\n  docforge run --projects projects.json --templates templates.json --stub"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the generation pipeline over the remaining task matrix.
    Run(RunArgs),

    /// Show progress and record-store statistics.
    Status(StatusArgs),
}

/// Arguments for `docforge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the project catalog (JSON array).
    #[arg(short = 'p', long)]
    pub projects: String,

    /// Path to the template catalog (JSON array).
    #[arg(short = 't', long)]
    pub templates: String,

    /// SQLite database for completed task records.
    #[arg(long, default_value = DEFAULT_RECORDS_DB)]
    pub records_db: String,

    /// Progress snapshot file used for resume.
    #[arg(long, default_value = DEFAULT_PROGRESS_FILE)]
    pub progress_file: String,

    /// LLM model to use, overriding DOCFORGE_MODEL and the built-in default.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY")]
    pub api_key: Option<String>,

    /// Use the offline stub client instead of a real generation API.
    #[arg(long)]
    pub stub: bool,

    /// Minimum delay between generation calls, in milliseconds.
    #[arg(long)]
    pub call_interval_ms: Option<u64>,

    /// Cooldown after a failed task, in seconds.
    #[arg(long)]
    pub failure_cooldown_secs: Option<u64>,

    /// Flush the progress snapshot every N completed tasks.
    #[arg(long)]
    pub flush_every: Option<usize>,

    /// Process at most this many projects.
    #[arg(long)]
    pub max_projects: Option<usize>,

    /// Process at most this many templates.
    #[arg(long)]
    pub max_templates: Option<usize>,

    /// Primary content language.
    #[arg(long)]
    pub primary_lang: Option<String>,

    /// Secondary content language.
    #[arg(long)]
    pub secondary_lang: Option<String>,

    /// Output the run summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `docforge status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// SQLite database for completed task records.
    #[arg(long, default_value = DEFAULT_RECORDS_DB)]
    pub records_db: String,

    /// Progress snapshot file used for resume.
    #[arg(long, default_value = DEFAULT_PROGRESS_FILE)]
    pub progress_file: String,
}

/// JSON-serializable run summary.
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    total: u64,
    succeeded: u64,
    failed: u64,
    degraded: u64,
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
    drained: bool,
    failures: Vec<FailureSummary>,
}

#[derive(Debug, Serialize)]
struct FailureSummary {
    task: String,
    error: String,
}

impl RunSummary {
    fn from_report(report: &RunReport) -> Self {
        Self {
            total: report.stats.total,
            succeeded: report.stats.succeeded,
            failed: report.stats.failed,
            degraded: report.stats.degraded,
            prompt_tokens: report.stats.usage.prompt_tokens,
            completion_tokens: report.stats.usage.completion_tokens,
            total_tokens: report.stats.usage.total_tokens,
            drained: report.drained,
            failures: report
                .stats
                .failures
                .iter()
                .map(|f| FailureSummary {
                    task: f.id.to_string(),
                    error: f.message.clone(),
                })
                .collect(),
        }
    }
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Status(args) => cmd_status(args).await,
    }
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut config = PipelineConfig::from_env()?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let mut projects = catalog::load_projects(Path::new(&args.projects))?;
    if let Some(cap) = config.max_projects {
        projects.truncate(cap);
    }
    let mut templates = catalog::load_templates(Path::new(&args.templates))?;
    if let Some(cap) = config.max_templates {
        templates.truncate(cap);
    }

    let progress = ProgressStore::load(&args.progress_file);
    let builder = TaskMatrixBuilder::new(projects, templates);
    let matrix_size = builder.full_matrix().len();
    let tasks = builder.remaining(&progress);

    info!(
        matrix = matrix_size,
        completed = progress.len(),
        remaining = tasks.len(),
        "Task matrix built"
    );

    if tasks.is_empty() {
        info!("All tasks already complete, nothing to do");
        if args.json {
            // Scripted consumers still get a summary on the no-work path.
            println!("{}", serde_json::to_string_pretty(&RunSummary::default())?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let client: Arc<dyn GenerationClient> = if args.stub {
        info!("Using the offline stub generation client");
        Arc::new(StubClient::new())
    } else {
        let api_key = args.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No API key: pass --api-key, set OPENROUTER_API_KEY, or use --stub for offline runs"
            )
        })?;
        Arc::new(OpenRouterClient::new(api_key, config.model.clone()))
    };

    let records = Arc::new(SqliteRecordStore::open(&args.records_db).await?);
    let flush_every = config.flush_every;
    let executor = PipelineExecutor::new(client, records, config);
    let controller = LifecycleController::new(executor, progress, flush_every);
    controller.install_signal_handlers();

    let report = controller.run(tasks).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&RunSummary::from_report(&report))?
        );
    } else {
        print_report(&report);
    }

    Ok(ExitCode::from(report.exit_code()))
}

async fn cmd_status(args: StatusArgs) -> anyhow::Result<ExitCode> {
    let progress = ProgressStore::load(&args.progress_file);
    println!(
        "Progress: {} completed task(s), cursor {}",
        progress.len(),
        progress.cursor()
    );

    // Inspection must not create an empty database as a side effect.
    if !Path::new(&args.records_db).exists() {
        println!("Records:  none (no database at {})", args.records_db);
        return Ok(ExitCode::SUCCESS);
    }

    let store = SqliteRecordStore::open_read_only(&args.records_db).await?;
    let stats = store.stats().await?;
    println!(
        "Records:  {} total, {} active, {} distinct pair(s)",
        stats.total, stats.active, stats.pairs
    );

    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(ms) = args.call_interval_ms {
        config.call_interval = std::time::Duration::from_millis(ms);
    }
    if let Some(secs) = args.failure_cooldown_secs {
        config.failure_cooldown = std::time::Duration::from_secs(secs);
    }
    if let Some(n) = args.flush_every {
        config.flush_every = n;
    }
    if args.max_projects.is_some() {
        config.max_projects = args.max_projects;
    }
    if args.max_templates.is_some() {
        config.max_templates = args.max_templates;
    }
    if let Some(lang) = &args.primary_lang {
        config.primary_language = lang.clone();
    }
    if let Some(lang) = &args.secondary_lang {
        config.secondary_language = lang.clone();
    }
}

fn print_report(report: &RunReport) {
    println!(
        "Run complete: {} total, {} succeeded ({} degraded), {} failed",
        report.stats.total, report.stats.succeeded, report.stats.degraded, report.stats.failed
    );
    println!(
        "Tokens: {} prompt + {} completion = {}",
        report.stats.usage.prompt_tokens,
        report.stats.usage.completion_tokens,
        report.stats.usage.total_tokens
    );
    if report.drained {
        println!("Run was interrupted; re-run to resume the remaining tasks.");
    }
    for failure in &report.stats.failures {
        println!("  FAILED {}: {}", failure.id, failure.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "docforge",
            "run",
            "--projects",
            "projects.json",
            "--templates",
            "templates.json",
            "--stub",
            "--flush-every",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.projects, "projects.json");
                assert!(args.stub);
                assert_eq!(args.flush_every, Some(3));
                assert!(args.model.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_parses_status_command() {
        let cli = Cli::try_parse_from(["docforge", "status"]).unwrap();
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.records_db, DEFAULT_RECORDS_DB);
                assert_eq!(args.progress_file, DEFAULT_PROGRESS_FILE);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = PipelineConfig::default();
        let cli = Cli::try_parse_from([
            "docforge",
            "run",
            "-p",
            "p.json",
            "-t",
            "t.json",
            "--call-interval-ms",
            "100",
            "--secondary-lang",
            "fr",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.call_interval, std::time::Duration::from_millis(100));
        assert_eq!(config.secondary_language, "fr");
        assert_eq!(config.primary_language, "en");
    }

    #[test]
    fn test_model_from_env_survives_when_flag_absent() {
        // Simulates DOCFORGE_MODEL having been applied by from_env: without
        // an explicit --model, overrides must leave it alone.
        let mut config = PipelineConfig {
            model: "env/model".to_string(),
            ..Default::default()
        };
        let cli = Cli::try_parse_from(["docforge", "run", "-p", "p.json", "-t", "t.json"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.model, "env/model");
    }

    #[test]
    fn test_model_flag_overrides_config() {
        let mut config = PipelineConfig {
            model: "env/model".to_string(),
            ..Default::default()
        };
        let cli = Cli::try_parse_from([
            "docforge",
            "run",
            "-p",
            "p.json",
            "-t",
            "t.json",
            "--model",
            "cli/model",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.model, "cli/model");
    }

    #[test]
    fn test_empty_run_summary_serializes_zero_counters() {
        let json = serde_json::to_string(&RunSummary::default()).unwrap();
        assert!(json.contains("\"total\":0"));
        assert!(json.contains("\"failures\":[]"));
        assert!(json.contains("\"drained\":false"));
    }
}
