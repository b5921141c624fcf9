//! Jenifesto - tiered identity retrieval CLI
//!
//! The `jenifesto` command drives the retrieval pipeline the way a document
//! viewer would, against fixture collaborators and a persistent store.
//!
//! ## Commands
//!
//! - `visit`: Load a page and run the tier 1 -> tier 2 pipeline
//! - `current`: Show the persisted current page
//! - `entity`: Show the primary entity for the current page
//! - `secondary`: Query the identifier sources for the current page
//! - `search`: Keyword search, excluding sources already answered at tier 2

mod fixtures;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};

use jenifesto_core::{
    MessageRouter, OrchestratorConfig, Request, Response, TieredOrchestrator, TtlCache, METRICS,
};
use jenifesto_store::{KvStore, StoreConfig, SurrealKvStore};

use crate::fixtures::FixtureCatalog;

#[derive(Parser)]
#[command(name = "jenifesto")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tiered identity retrieval for a document viewer", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Orchestrator settings (TOML); defaults to JENIFESTO_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fixture catalog (JSON); defaults to the bundled catalog
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    /// Store URL (mem://, surrealkv://path, ws://host)
    #[arg(long, global = true, env = "JENIFESTO_STORE_URL")]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page and run the retrieval pipeline, printing each event
    Visit {
        /// Page title
        #[arg(long)]
        title: String,

        /// Page URL
        #[arg(long)]
        url: String,

        /// Primary entity id (e.g. Q42)
        #[arg(long)]
        qid: Option<String>,
    },

    /// Show the current page
    Current,

    /// Show the primary entity for the current page
    Entity,

    /// Query identifier sources for the current page's entity
    Secondary,

    /// Search by keyword, excluding sources satisfied at tier 2
    Search {
        /// Free-text query
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    jenifesto_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;
    let catalog = match cli.fixtures.as_deref() {
        Some(path) => FixtureCatalog::load(path)?,
        None => FixtureCatalog::builtin()?,
    };

    let store_config = match cli.store {
        Some(url) => StoreConfig::new(url),
        None => StoreConfig::from_env(),
    };
    let store: Arc<dyn KvStore> = Arc::new(
        SurrealKvStore::connect(&store_config)
            .await
            .context("Failed to open Jenifesto store")?,
    );

    let (fetcher, registry) = catalog.into_collaborators();
    let orchestrator =
        TieredOrchestrator::new(fetcher, registry, TtlCache::new(store.clone()), config);
    let router = MessageRouter::build(orchestrator, store).await;

    let outcome = match cli.command {
        Commands::Visit { title, url, qid } => cmd_visit(&router, title, url, qid).await,
        Commands::Current => cmd_request(&router, Request::GetCurrentPage).await,
        Commands::Entity => cmd_request(&router, Request::GetPrimaryEntity).await,
        Commands::Secondary => cmd_secondary(&router).await,
        Commands::Search { query } => {
            cmd_request(&router, Request::SearchTertiary { query }).await
        }
    };

    METRICS.flush();
    outcome
}

/// Settings from `--config`, else from the environment.
fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: OrchestratorConfig =
                toml::from_str(&raw).with_context(|| format!("Invalid config {:?}", path))?;
            debug!(?config, "loaded config file");
            Ok(config)
        }
        None => Ok(OrchestratorConfig::from_env()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a reply, turning an error reply into a failed exit.
fn finish(response: Response) -> Result<()> {
    match response {
        Response::Error { error } => bail!(error),
        other => print_json(&other),
    }
}

/// Load a page and print every broadcast event as one JSON line
async fn cmd_visit(
    router: &MessageRouter,
    title: String,
    url: String,
    qid: Option<String>,
) -> Result<()> {
    let mut events = router.subscribe();
    info!(title = %title, "visiting page");

    let reply = router
        .handle(Request::PageLoaded {
            title,
            url,
            primary_id: qid,
        })
        .await;

    while let Ok(event) = events.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    finish(reply)
}

async fn cmd_request(router: &MessageRouter, request: Request) -> Result<()> {
    finish(router.handle(request).await)
}

/// Tier 2 for the current page, using the identifiers of its entity
async fn cmd_secondary(router: &MessageRouter) -> Result<()> {
    let entity = match router.handle(Request::GetPrimaryEntity).await {
        Response::PrimaryEntity { data } => data,
        Response::Error { error } => bail!(error),
        other => bail!("Unexpected reply: {:?}", other),
    };

    if entity.identifiers.is_empty() {
        println!("{} has no identifiers to look up", entity.id);
        return Ok(());
    }

    finish(
        router
            .handle(Request::GetSecondaryResults {
                identifiers: Some(entity.identifiers),
            })
            .await,
    )
}
