//! Command line front end for the dataset service client.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sodaport_core::{
    load_config, validate_config, Dataset, InterruptHandle, SanitizedConfig, SearchQuery,
    SodaClient,
};

/// Exit status after a second Ctrl+C (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

/// Command-line arguments for sodaport
#[derive(Parser, Debug)]
#[command(name = "sodaport")]
#[command(about = "Import, publish and search datasets on a hosted data service")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "sodaport.toml", env = "SODAPORT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file and print the columns the service guesses
    Scan { file: PathBuf },

    /// Create one dataset per file with the default blueprint
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dataset name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Publish each dataset once imported
        #[arg(long)]
        publish: bool,
    },

    /// Publish a dataset or working copy
    Publish { id: String },

    /// Create a working copy of a published dataset
    WorkingCopy { id: String },

    /// Show the pending geocoding backlog of a dataset
    Geocoding { id: String },

    /// Show a dataset
    Show { id: String },

    /// Delete a dataset
    Delete { id: String },

    /// Search datasets by name
    Search {
        query: String,

        #[arg(long, default_value = "20")]
        limit: u32,

        #[arg(long, default_value = "1")]
        page: u32,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!(config = ?SanitizedConfig::from(&config), "Configuration loaded");

    let client = SodaClient::from_config(&config).context("Failed to create client")?;
    tokio::spawn(interrupt_on_ctrl_c(client.interrupt_handle().clone()));

    match args.command {
        Command::Scan { file } => {
            let scan = client
                .importer()
                .scan(&file)
                .await
                .with_context(|| format!("Failed to scan {:?}", file))?;
            print_json(&scan)
        }
        Command::Import {
            files,
            name,
            description,
            publish,
        } => import(&client, &files, name.as_deref(), &description, publish).await,
        Command::Publish { id } => {
            let dataset = client
                .publisher()
                .publish(&id)
                .await
                .with_context(|| format!("Failed to publish {}", id))?;
            print_json(&dataset)
        }
        Command::WorkingCopy { id } => {
            let copy = client
                .publisher()
                .create_working_copy(&id)
                .await
                .with_context(|| format!("Failed to create a working copy of {}", id))?;
            print_json(&copy)
        }
        Command::Geocoding { id } => {
            let status = client
                .publisher()
                .find_pending_geocoding(&id)
                .await
                .with_context(|| format!("Failed to read geocoding status of {}", id))?;
            print_json(&status)
        }
        Command::Show { id } => {
            let dataset = client
                .views()
                .load_view(&id)
                .await
                .with_context(|| format!("Failed to load {}", id))?;
            print_json(&dataset)
        }
        Command::Delete { id } => {
            client
                .views()
                .delete_view(&id)
                .await
                .with_context(|| format!("Failed to delete {}", id))?;
            Ok(())
        }
        Command::Search { query, limit, page } => {
            let query = SearchQuery::new(query).with_limit(limit).with_page(page);
            let results = client
                .views()
                .search(&query)
                .await
                .context("Search failed")?;
            print_json(&results)
        }
    }
}

/// Import every file concurrently; fails if any import failed.
async fn import(
    client: &SodaClient,
    files: &[PathBuf],
    name: Option<&str>,
    description: &str,
    publish: bool,
) -> Result<()> {
    let tasks = files.iter().map(|file| {
        let client = client.clone();
        let file = file.clone();
        let name = dataset_name(name, &file, files.len() > 1);
        let description = description.to_string();
        tokio::spawn(async move {
            let result = import_one(&client, &name, &description, &file, publish).await;
            (file, result)
        })
    });

    let mut imported = Vec::new();
    let mut failures = 0;
    for joined in futures::future::join_all(tasks).await {
        let (file, result) = joined.context("Import task panicked")?;
        match result {
            Ok(dataset) => imported.push(dataset),
            Err(e) => {
                failures += 1;
                error!(file = %file.display(), "Import failed: {:#}", e);
            }
        }
    }

    print_json(&imported)?;
    if failures > 0 {
        anyhow::bail!("{} of {} imports failed", failures, files.len());
    }
    Ok(())
}

async fn import_one(
    client: &SodaClient,
    name: &str,
    description: &str,
    file: &Path,
    publish: bool,
) -> Result<Dataset> {
    let dataset = client
        .importer()
        .create_from_file_default(name, description, file)
        .await
        .with_context(|| format!("Failed to import {:?}", file))?;

    if !publish {
        return Ok(dataset);
    }
    let id = dataset.require_id()?;
    client
        .publisher()
        .publish(id)
        .await
        .with_context(|| format!("Failed to publish {}", id))
}

/// With several files, a shared name is suffixed by each file stem.
fn dataset_name(name: Option<&str>, file: &Path, several: bool) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name {
        Some(name) if several => format!("{} ({})", name, stem),
        Some(name) => name.to_string(),
        None => stem,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}

/// First Ctrl+C cancels waits in progress; a second one exits.
async fn interrupt_on_ctrl_c(interrupt: InterruptHandle) {
    let next_ctrl_c = || async {
        match signal::ctrl_c().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                false
            }
        }
    };

    if escalate_interrupts(next_ctrl_c, &interrupt).await {
        error!("Interrupted again, exiting");
        std::process::exit(EXIT_INTERRUPTED);
    }
}

/// Fires `interrupt` on the first signal. Returns true once a second signal
/// arrives, false if signals stop before that.
async fn escalate_interrupts<F, Fut>(mut next_signal: F, interrupt: &InterruptHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !next_signal().await {
        return false;
    }
    warn!("Interrupt received, cancelling waits (press Ctrl+C again to exit)");
    interrupt.interrupt();

    next_signal().await
}
