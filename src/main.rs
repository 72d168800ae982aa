//! Sumi-Inquiry main entry point
//!
//! This is the command-line interface for the Sumi-Inquiry site crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sumi_inquiry::analysis::ChatAnalyzer;
use sumi_inquiry::config::{load_config_with_hash, Config};
use sumi_inquiry::storage::{open_store, PageStore, SqlitePageStore};
use sumi_inquiry::{CrawlEngine, CrawlOutcome};
use tracing_subscriber::EnvFilter;

/// How often the crawl command logs progress
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Sumi-Inquiry: a question-answering site crawler
///
/// Sumi-Inquiry walks a single website breadth-first, summarizes each page
/// with a language model, and stops as soon as a page answers your question.
#[derive(Parser, Debug)]
#[command(name = "sumi-inquiry")]
#[command(version = "1.0.0")]
#[command(about = "A question-answering site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite page store, overriding `[storage] database-path`
    #[arg(long, value_name = "PATH", global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site, optionally until a page answers a question
    Crawl {
        /// Absolute http(s) URL; only pages on its origin are visited
        start_url: String,

        /// Stop at the first page that answers this question
        #[arg(short = 'Q', long)]
        question: Option<String>,

        /// Page budget (defaults to `[crawler] max-pages`)
        #[arg(short, long)]
        max_pages: Option<usize>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show statistics from the page store and exit
    Stats,

    /// Generate a markdown digest of stored pages
    ExportSummary {
        /// Where to write the markdown file
        #[arg(value_name = "PATH")]
        output: PathBuf,
    },

    /// List stored pages
    Pages {
        /// Only pages linked to this keyword
        #[arg(short, long)]
        keyword: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let database = cli.database.clone().or_else(|| {
        config
            .storage
            .as_ref()
            .map(|storage| PathBuf::from(&storage.database_path))
    });

    match cli.command {
        Command::Crawl {
            start_url,
            question,
            max_pages,
            json,
        } => {
            handle_crawl(
                &config,
                database.as_deref(),
                &start_url,
                question.as_deref(),
                max_pages,
                json,
            )
            .await
        }
        Command::Stats => handle_stats(require_database(database.as_deref())?),
        Command::ExportSummary { output } => {
            handle_export_summary(require_database(database.as_deref())?, &output)
        }
        Command::Pages { keyword } => {
            handle_pages(require_database(database.as_deref())?, keyword.as_deref())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_inquiry=info,warn"),
            1 => EnvFilter::new("sumi_inquiry=debug,info"),
            2 => EnvFilter::new("sumi_inquiry=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn require_database(database: Option<&Path>) -> anyhow::Result<&Path> {
    match database {
        Some(path) => Ok(path),
        None => bail!("No page store configured; pass --database or set [storage] database-path"),
    }
}

/// Handles the crawl command
async fn handle_crawl(
    config: &Config,
    database: Option<&Path>,
    start_url: &str,
    question: Option<&str>,
    max_pages: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let analyzer = match ChatAnalyzer::from_env(&config.analyzer) {
        Some(analyzer) => Arc::new(analyzer.context("Failed to build analyzer client")?),
        None => bail!(
            "Environment variable {} is not set; the analyzer needs an API key",
            config.analyzer.api_key_env
        ),
    };

    let store: Option<Arc<dyn PageStore>> = match database {
        Some(path) => {
            tracing::info!("Persisting pages to {}", path.display());
            Some(Arc::new(open_store(path).with_context(|| {
                format!("Failed to open page store {}", path.display())
            })?))
        }
        None => {
            tracing::info!("No page store configured, pages will not be persisted");
            None
        }
    };

    let engine = Arc::new(CrawlEngine::new(config, analyzer, store)?);
    let mut job = engine.start_crawl(start_url, question, max_pages)?;

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current page");
            stop.request_stop();
        }
    });

    let status = engine.status_reporter();
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    let outcome = loop {
        tokio::select! {
            result = &mut job => break result.context("Crawl task failed")?,
            _ = ticker.tick() => {
                let snapshot = status.snapshot();
                tracing::info!(
                    "Progress: {}/{} pages{}",
                    snapshot.pages_processed,
                    snapshot.total_pages,
                    snapshot
                        .current_url
                        .map(|url| format!(", at {}", url))
                        .unwrap_or_default()
                );
            }
        }
    };

    print_outcome(&outcome, question, json)
}

fn print_outcome(outcome: &CrawlOutcome, question: Option<&str>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!(
        "Crawl {} after {} pages",
        if outcome.stopped { "stopped" } else { "completed" },
        outcome.pages_processed
    );

    match (&outcome.found_answer, question) {
        (Some(found), _) => {
            println!("\nAnswer: {}", found.answer);
            println!("Source: {} ({})", found.title, found.url);
        }
        (None, Some(_)) => println!("\nNo page answered the question."),
        (None, None) => {}
    }

    Ok(())
}

/// Handles the stats command: shows statistics from the page store
fn handle_stats(database: &Path) -> anyhow::Result<()> {
    use sumi_inquiry::output::{load_statistics, print_statistics};

    println!("Database: {}\n", database.display());

    let store = open_existing(database)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the export-summary command: generates a markdown digest
fn handle_export_summary(database: &Path, output: &Path) -> anyhow::Result<()> {
    use sumi_inquiry::output::{generate_markdown_summary, load_statistics};

    println!("=== Exporting Page Summary ===\n");
    println!("Database: {}", database.display());
    println!("Output: {}", output.display());
    println!();

    let store = open_existing(database)?;

    tracing::info!("Loading pages from database...");
    let stats = load_statistics(&store)?;
    let pages = store.list_pages()?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&stats, &pages, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Summary of {} pages exported to: {}", pages.len(), output.display());

    Ok(())
}

/// Handles the pages command: lists stored pages
fn handle_pages(database: &Path, keyword: Option<&str>) -> anyhow::Result<()> {
    let store = open_existing(database)?;
    let pages = match keyword {
        Some(keyword) => store.pages_with_keyword(keyword)?,
        None => store.list_pages()?,
    };

    if pages.is_empty() {
        println!("No pages found.");
        return Ok(());
    }

    for page in &pages {
        println!("{}\n  {}", page.url, page.title);
        if !page.keywords.is_empty() {
            println!("  keywords: {}", page.keywords.join(", "));
        }
    }
    println!("\n{} pages", pages.len());

    Ok(())
}

fn open_existing(database: &Path) -> anyhow::Result<SqlitePageStore> {
    if !database.exists() {
        bail!("Database {} does not exist", database.display());
    }
    open_store(database).with_context(|| format!("Failed to open {}", database.display()))
}
