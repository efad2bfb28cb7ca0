//! etdq - ETD ingestion command-line front end
//!
//! Thin shell over [`PipelineOrchestrator`]: parses arguments, loads
//! settings, wires the HTTP and S3 clients, and prints the outcome as
//! JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etdq_common::{EventBus, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

use etdq_ingest::services::catalog::AlmaCatalog;
use etdq_ingest::services::files::S3Store;
use etdq_ingest::stores::{HttpRequestQueue, HttpTrackingStore};
use etdq_ingest::PipelineOrchestrator;

#[derive(Parser)]
#[command(name = "etdq", version, about = "Thesis and dissertation ingestion pipeline")]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, env = "ETDQ_CONFIG")]
    config: Option<PathBuf>,

    /// Override the tracking store base URL (test deployments)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one bag, or every requested bag awaiting ingest
    Ingest {
        /// Bag name; omit to discover candidates from the request queue
        bag: Option<String>,
        /// Target collection handle, bypassing the classifier
        #[arg(long)]
        collection: Option<String>,
    },
    /// Report missing required catalog fields for record identifiers
    Check {
        /// MMS IDs to check
        #[arg(required = true)]
        mmsids: Vec<String>,
    },
    /// Queue notifications for requested records with incomplete metadata
    NotifyMissing,
    /// Point a catalog record's electronic location at a repository URL
    UpdateUrl {
        /// MMS ID of the record to update
        mmsid: String,
        /// Repository URL to record
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting etdq {}", env!("CARGO_PKG_VERSION"));

    let mut settings =
        Settings::resolve(cli.config.as_deref()).context("Could not load settings")?;
    if let Some(endpoint) = cli.endpoint {
        settings.tracking.base_url = endpoint;
    }

    // One HTTP client shared by every gateway
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Could not build HTTP client")?;
    let catalog = Arc::new(AlmaCatalog::new(client.clone(), &settings.catalog));
    let store = Arc::new(S3Store::connect(&settings.storage).await);
    let tracking = Arc::new(HttpTrackingStore::new(
        client.clone(),
        &settings.tracking,
        &settings.storage.source,
    ));
    let requests = Arc::new(HttpRequestQueue::new(client, &settings.tracking));
    let events = EventBus::new(100);

    // Log every pipeline event as it happens
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "pipeline event"),
                Err(_) => info!(?event, "pipeline event"),
            }
        }
    });

    let orchestrator =
        PipelineOrchestrator::new(settings, catalog, store, tracking, requests, events);

    match cli.command {
        Command::Ingest { bag, collection } => {
            let outcome = orchestrator.ingest(bag, collection).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Check { mmsids } => {
            let report = orchestrator.check(&mmsids).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::NotifyMissing => {
            let affected = orchestrator.notify_missing().await?;
            println!("{}", serde_json::to_string_pretty(&affected)?);
        }
        Command::UpdateUrl { mmsid, url } => {
            let update = orchestrator.update_url(&mmsid, &url).await?;
            println!("{}", serde_json::to_string_pretty(&update)?);
        }
    }

    Ok(())
}
