//! Favicon CLI: run the pipeline, the source sweep or seed records by hand.
//!
//! Reads the same environment as the API service (DATABASE_URL, STORAGE_BACKEND, ...).

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use favicon_cli::{init_tracing, manual_event};
use favicon_core::FaviconConfig;
use favicon_services::{
    create_storage, CleanupService, FaviconPipeline, FaviconRecordRepository, PipelineSettings,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "favicon", about = "Favicon pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and publish the favicon set from an uploaded object
    Process {
        /// Object path, e.g. siteImages/favicon_1700000000000.png
        #[arg(long)]
        object: String,
        /// Content type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Pending record to complete
        #[arg(long)]
        record_id: Option<Uuid>,
        /// Object size in bytes, stored on a newly created record
        #[arg(long, default_value = "0")]
        size: u64,
        /// Object generation; distinguishes an overwrite from a redelivery
        #[arg(long)]
        generation: Option<String>,
    },
    /// Run the source-file sweep once
    Sweep,
    /// Create a processing record for an object, as the uploading client does
    Request {
        #[arg(long)]
        object: String,
        #[arg(long)]
        size: Option<i64>,
    },
    /// Show a favicon record
    Show { id: Uuid },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = FaviconConfig::from_env()?;
    config.validate().context("Configuration validation failed")?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    if let Commands::Sweep = cli.command {
        let report = CleanupService::from_config(storage, &config)
            .run_once()
            .await;
        return print_json(&report);
    }

    let pool = favicon_db::connect(&config).await?;
    favicon_db::run_migrations(&pool).await?;
    let records = Arc::new(FaviconRecordRepository::new(pool));
    let pipeline = FaviconPipeline::new(storage, records, PipelineSettings::from(&config));

    match cli.command {
        Commands::Process {
            object,
            content_type,
            record_id,
            size,
            generation,
        } => {
            let event = manual_event("cli", &object, content_type, size, record_id, generation);
            tracing::info!(object = %event.object_path, content_type = ?event.content_type, "Processing upload");
            let outcome = pipeline.run(&event).await?;
            print_json(&outcome)?;
        }
        Commands::Request { object, size } => {
            let record = pipeline.reconciler().request(&object, size).await?;
            print_json(&record)?;
        }
        Commands::Show { id } => {
            let record = pipeline
                .reconciler()
                .get(id)
                .await?
                .with_context(|| format!("No favicon record {}", id))?;
            print_json(&record)?;
        }
        // Handled before connecting to the database.
        Commands::Sweep => {}
    }

    Ok(())
}
