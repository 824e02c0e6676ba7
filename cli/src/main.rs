use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatdesk_knowledge::{KnowledgeCatalog, KnowledgeSelector};
use chatdesk_retrieval::{AnswerPipeline, InMemoryStore, PipelineConfig};

#[derive(Parser)]
#[command(name = "chatdesk")]
#[command(about = "Resolve support questions from a knowledge catalog and tenant documents")]
#[command(version)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge catalog (TOML or JSON); the built-in catalog when omitted
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match an utterance against the knowledge catalog only
    Match {
        /// The customer's message
        utterance: String,
    },
    /// Run the full answer pipeline against a JSON store fixture
    Resolve {
        /// Workspace id the question was asked in
        #[arg(long)]
        tenant: String,
        /// JSON fixture with documents, chunks and owner mappings
        #[arg(long)]
        store: PathBuf,
        /// The customer's message
        utterance: String,
    },
    /// Validate a knowledge catalog file
    CheckCatalog {
        /// Catalog file to validate
        path: PathBuf,
        /// Fail when any question pattern was skipped
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Match { utterance } => {
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let selector = KnowledgeSelector::new(catalog, config.selector);
            let hit = selector.select(&utterance);
            if hit.is_none() {
                info!("No confident catalog match");
            }
            println!("{}", serde_json::to_string_pretty(&hit)?);
        }
        Commands::Resolve {
            tenant,
            store,
            utterance,
        } => {
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let store = InMemoryStore::load_json(&store)
                .await
                .with_context(|| format!("failed to load store {}", store.display()))?;
            let pipeline = AnswerPipeline::builder()
                .with_config(config)
                .with_catalog(catalog)
                .with_store(Arc::new(store))
                .build()?;

            let resolution = pipeline.resolve(&tenant, &utterance).await;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::CheckCatalog { path, strict } => {
            let catalog = KnowledgeCatalog::load(&path)
                .with_context(|| format!("invalid catalog {}", path.display()))?;
            for skipped in catalog.skipped_patterns() {
                warn!("{skipped}");
            }
            println!("{}", serde_json::to_string_pretty(&describe_catalog(&catalog))?);
            if strict && !catalog.skipped_patterns().is_empty() {
                bail!(
                    "{} question patterns failed to compile",
                    catalog.skipped_patterns().len()
                );
            }
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<Arc<KnowledgeCatalog>> {
    let catalog = match path {
        Some(path) => KnowledgeCatalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => KnowledgeCatalog::builtin().context("built-in catalog is invalid")?,
    };
    Ok(Arc::new(catalog))
}

fn describe_catalog(catalog: &KnowledgeCatalog) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = catalog
        .entries()
        .map(|e| {
            json!({
                "id": e.entry().id,
                "patterns": e.patterns().len(),
                "keywords": e.keywords().len(),
                "priority": e.entry().priority,
            })
        })
        .collect();
    let skipped: Vec<String> = catalog
        .skipped_patterns()
        .iter()
        .map(ToString::to_string)
        .collect();

    json!({
        "version": catalog.version(),
        "entries": entries,
        "skipped_patterns": skipped,
    })
}
