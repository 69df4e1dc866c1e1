use anyhow::Context;
use book_scraper::apis::classifier::classify_source;
use book_scraper::app::ports::{CatalogPort, HttpClientPort};
use book_scraper::common::constants::UNTITLED_SENTINEL;
use book_scraper::config::AppConfig;
use book_scraper::infra::http_client::ReqwestHttp;
use book_scraper::infra::in_memory_catalog::InMemoryCatalog;
use book_scraper::infra::sqlite_catalog::SqliteCatalog;
use book_scraper::observability::{init_logging, init_metrics};
use book_scraper::pipeline::orchestrator::{ErrorEnvelope, Orchestrator, RunMode};
use book_scraper::pipeline::processing::date::normalize_publication_date;
use book_scraper::server;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "book_scraper")]
#[command(about = "Import book metadata from Goodreads and Fandom wiki pages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the normalized record for a book page without touching the catalog
    Scrape {
        url: String,
        /// Title the page gets when it has none
        #[arg(long, num_args = 0..=1, default_missing_value = UNTITLED_SENTINEL)]
        fallback_title: Option<String>,
    },
    /// Normalize a book page and reconcile its authors, genres and series
    Import {
        url: String,
        #[arg(long, num_args = 0..=1, default_missing_value = UNTITLED_SENTINEL)]
        fallback_title: Option<String>,
    },
    /// Print the source a URL belongs to
    Classify { url: String },
    /// Normalize free-text publication date
    NormalizeDate {
        text: String,
        /// Secondary, often year-only, date text
        #[arg(long)]
        raw: Option<String>,
    },
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn open_catalog(config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogPort>> {
    match &config.catalog.sqlite_path {
        Some(path) => {
            let catalog = SqliteCatalog::open(path)
                .with_context(|| format!("opening catalog at {}", path.display()))?;
            Ok(Arc::new(catalog))
        }
        None => {
            warn!("No catalog.sqlite_path configured, using an in-memory catalog");
            Ok(Arc::new(InMemoryCatalog::new()))
        }
    }
}

fn build_orchestrator(config: &AppConfig, fallback_title: Option<String>) -> anyhow::Result<Orchestrator> {
    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::from_config(&config.http)?);
    let catalog = open_catalog(config)?;
    let orchestrator = Orchestrator::from_config(config, http, Some(catalog))?;
    Ok(match fallback_title {
        Some(title) => orchestrator.with_fallback_title(Some(title)),
        None => orchestrator,
    })
}

async fn run_once(config: &AppConfig, url: &str, mode: RunMode, fallback_title: Option<String>) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config, fallback_title)?;
    match orchestrator.run(url, mode).await {
        Ok(outcome) => {
            let json = match mode {
                RunMode::Preview => serde_json::to_string_pretty(&outcome.fields)?,
                RunMode::Persist => serde_json::to_string_pretty(&outcome)?,
            };
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorEnvelope::from_error(&e))?);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    init_logging(&config.logging.dir);

    match cli.command {
        Commands::Scrape { url, fallback_title } => {
            run_once(&config, &url, RunMode::Preview, fallback_title).await?;
        }
        Commands::Import { url, fallback_title } => {
            run_once(&config, &url, RunMode::Persist, fallback_title).await?;
        }
        Commands::Classify { url } => {
            println!("{}", classify_source(&url));
        }
        Commands::NormalizeDate { text, raw } => {
            let date = normalize_publication_date(Some(&text), raw.as_deref());
            println!("{}", serde_json::to_string_pretty(&date)?);
        }
        Commands::Serve { port } => {
            init_metrics();
            let port = port.unwrap_or(config.server.port);
            let orchestrator = Arc::new(build_orchestrator(&config, None)?);
            info!("Starting server on port {}", port);
            server::start_server(orchestrator, port).await?;
        }
    }

    Ok(())
}
