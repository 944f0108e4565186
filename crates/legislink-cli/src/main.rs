use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use legislink_core::{PhaseResolver, PipelineConfig};
use legislink_store::{DuckStore, MemoryStore};
use legislink_sync::{
    EliClient, GovernmentSource, JsonFileSource, Linker, Pipeline, RunOptions, SaosClient,
    SejmClient, SyncReport, Unifier,
};
use tracing::info;

mod display;

#[derive(Debug, Parser)]
#[command(
    name = "legislink",
    version,
    about = "Link government drafts to parliamentary processes and track their phase"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON pipeline configuration (defaults apply to missing keys)
    #[arg(long, global = true, env = "LEGISLINK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Link, unify and persist every draft in a government listing
    Sync(SyncArgs),
    /// Link a government listing and print the link results as JSON
    Link(SourceArgs),
    /// Show a stored project and its timeline
    Show {
        /// DuckDB database file
        #[arg(long, env = "LEGISLINK_DB")]
        db: PathBuf,
        /// Government registry id
        id: String,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Government listing dump (`{"projects": [...]}` or a bare array)
    #[arg(long)]
    source: PathBuf,

    /// Parliamentary terms to search, newest first (e.g. `10,9`)
    #[arg(long, value_delimiter = ',')]
    terms: Option<Vec<u32>>,
}

#[derive(Debug, Args)]
struct SyncArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// DuckDB database file; without it the run is a dry run in memory
    #[arg(long, env = "LEGISLINK_DB")]
    db: Option<PathBuf>,

    /// Process at most this many drafts
    #[arg(long)]
    limit: Option<usize>,

    /// Skip linking; every draft is stored as government stage only
    #[arg(long)]
    no_link: bool,

    /// Skip committee, voting, publication and tribunal lookups
    #[arg(long)]
    no_enrich: bool,

    /// Skip drafts synced within this many hours
    #[arg(long, value_name = "HOURS")]
    skip_recent: Option<u32>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("legislink error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;
    info!("legislink v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Sync(args) => {
            apply_overrides(&mut config, &args.source);
            if args.no_enrich {
                config.enrich = false;
            }
            sync(&config, &args).await
        }
        Commands::Link(args) => {
            apply_overrides(&mut config, &args);
            link(&config, &args.source).await
        }
        Commands::Show { db, id } => show(&db, &id),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn apply_overrides(config: &mut PipelineConfig, args: &SourceArgs) {
    if let Some(terms) = &args.terms {
        config.terms = terms.clone();
    }
}

async fn sync(config: &PipelineConfig, args: &SyncArgs) -> anyhow::Result<()> {
    let sejm = Arc::new(SejmClient::new(&config.sejm_base_url)?);
    let linker = Linker::new(sejm.clone(), config);
    let unifier = Unifier::new(PhaseResolver::new(config.phase_keywords.clone()))
        .with_parliament(sejm)
        .with_publications(Arc::new(EliClient::new(&config.eli_base_url)?))
        .with_tribunal(Arc::new(SaosClient::new(&config.saos_base_url)?))
        .enrich(config.enrich);
    let source = Arc::new(JsonFileSource::new(&args.source.source));
    let mut pipeline = Pipeline::new(source, linker, unifier);

    let options = RunOptions {
        limit: args.limit,
        link: !args.no_link,
        skip_recent_hours: args.skip_recent,
    };
    let result = match &args.db {
        Some(path) => {
            let mut store = DuckStore::open_persistent(path)
                .with_context(|| format!("opening database {}", path.display()))?;
            pipeline.run(&mut store, &options).await
        }
        None => {
            info!("no --db given, results are kept in memory only");
            let mut store = MemoryStore::new();
            pipeline.run(&mut store, &options).await
        }
    };
    let report = result
        .map_err(|e| anyhow::anyhow!("sync failed after {} projects: {e}", e.processed()))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    let summary = &report.summary;
    println!("Run {}", report.run_id);
    println!("  {:<10} {}", "scraped", summary.scraped);
    println!("  {:<10} {}", "skipped", report.skipped);
    println!("  {:<10} {}", "linked", summary.linked);
    println!("  {:<10} {}", "inserted", summary.inserted);
    println!("  {:<10} {}", "updated", summary.updated);
    if !report.by_phase.is_empty() {
        println!("Phases");
        for (phase, count) in &report.by_phase {
            println!("  {:<10} {}", phase.as_str(), count);
        }
    }
}

async fn link(config: &PipelineConfig, source: &Path) -> anyhow::Result<()> {
    let records = JsonFileSource::new(source)
        .fetch_records()
        .await
        .with_context(|| format!("reading {}", source.display()))?;
    let sejm = Arc::new(SejmClient::new(&config.sejm_base_url)?);
    let mut linker = Linker::new(sejm, config);
    let results = linker.link_all(records).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn show(db: &Path, id: &str) -> anyhow::Result<()> {
    let store = DuckStore::open_persistent(db)
        .with_context(|| format!("opening database {}", db.display()))?;
    let project = store
        .project_batch(id)
        .with_context(|| format!("project {id} not found"))?;
    display::print_project_card(&project);

    let stages = store.stage_batches(id)?;
    if stages.iter().any(|b| b.num_rows() > 0) {
        println!("Timeline");
        println!("{}", arrow::util::pretty::pretty_format_batches(&stages)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags_parse() {
        let cli = Cli::try_parse_from([
            "legislink",
            "sync",
            "--source",
            "rcl.json",
            "--terms",
            "10,9,8",
            "--limit",
            "5",
            "--no-enrich",
            "--skip-recent",
            "12",
        ])
        .unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.source.terms, Some(vec![10, 9, 8]));
        assert_eq!(args.limit, Some(5));
        assert!(args.no_enrich);
        assert!(!args.no_link);
        assert_eq!(args.skip_recent, Some(12));
    }

    #[test]
    fn show_requires_db() {
        assert!(Cli::try_parse_from(["legislink", "show", "12345"]).is_err());
        let cli =
            Cli::try_parse_from(["legislink", "show", "--db", "legis.duckdb", "12345"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { ref id, .. } if id == "12345"));
    }

    #[test]
    fn terms_override_config() {
        let mut config = PipelineConfig::default();
        let args = SourceArgs {
            source: PathBuf::from("rcl.json"),
            terms: Some(vec![9]),
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.terms, vec![9]);
    }
}
