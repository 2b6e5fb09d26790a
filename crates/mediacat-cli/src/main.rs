//! mediacat: command-line front end for the media catalog.
//!
//! Reads the backend and quota settings from the environment (or `.env`). Each run is
//! a fresh process, so the index is rebuilt from the store before the first command
//! touches it; ids printed by one run are not valid in the next, storage keys are.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediacat_cli::{content_type_for_path, print_media_table, print_usage, Target};
use mediacat_core::{AppError, Config, MediaPatch, MediaRecord};
use mediacat_infra::{
    init_telemetry, log_error, shutdown_telemetry, ErrorResponse, TelemetryConfig,
};
use mediacat_services::{CreateMediaRequest, MediaCatalog};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "mediacat", about = "Quota-enforced media catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List media records
    List {
        /// Only records in this platform group
        #[arg(long)]
        platform: Option<String>,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Upload an image, video or audio file
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Platform group the media belongs to
        #[arg(long)]
        platform: Option<String>,
        /// Mark as the platform's thumbnail
        #[arg(long)]
        thumbnail: bool,
        /// Override the content type guessed from the extension
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Update a record's name, platform or thumbnail flag
    Update {
        /// Record id or storage key
        target: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_platform")]
        platform: Option<String>,
        /// Remove the record from its platform group
        #[arg(long)]
        clear_platform: bool,
        #[arg(long)]
        thumbnail: Option<bool>,
    },
    /// Delete a record and its stored object
    Delete {
        /// Record id or storage key
        target: String,
    },
    /// Show aggregate storage usage against the capacity ceiling
    Usage {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Rebuild the index from the store listing
    Reconcile,
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}

async fn resolve(catalog: &MediaCatalog, target: &str) -> Result<MediaRecord, AppError> {
    match Target::parse(target) {
        Target::Id(id) => catalog.get_media(id).await,
        Target::Key(key) => catalog.find_by_key(&key).await,
    }
}

async fn run(cli: Cli, config: &Config) -> Result<(), AppError> {
    let catalog = MediaCatalog::from_config(config).await?;

    match cli.command {
        Commands::List { platform, format } => {
            let records = match platform {
                Some(platform) => catalog.list_platform(&platform).await?,
                None => catalog.list_media().await?,
            };
            match format.as_str() {
                "json" => print_json(&records)?,
                _ => print_media_table(&records),
            }
        }
        Commands::Upload {
            file,
            name,
            platform,
            thumbnail,
            content_type,
        } => {
            // Reject oversized files before reading them into memory.
            let unreadable = |e: std::io::Error| {
                AppError::InvalidInput(format!("Cannot read {}: {}", file.display(), e))
            };
            let size = tokio::fs::metadata(&file).await.map_err(unreadable)?.len();
            catalog.quota().check_object_size(size)?;

            let data = tokio::fs::read(&file).await.map_err(unreadable)?;
            let original_filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content_type = content_type.unwrap_or_else(|| content_type_for_path(&file));

            let mut request = CreateMediaRequest::new(data, content_type, original_filename)
                .thumbnail(thumbnail);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            if let Some(platform) = platform {
                request = request.with_platform(platform);
            }

            let record = catalog.create_media(request).await?;
            print_json(&record)?;
        }
        Commands::Update {
            target,
            name,
            platform,
            clear_platform,
            thumbnail,
        } => {
            let record = resolve(&catalog, &target).await?;

            let mut patch = MediaPatch::default();
            if let Some(name) = name {
                patch = patch.name(name);
            }
            if clear_platform {
                patch = patch.platform(None);
            } else if let Some(platform) = platform.as_deref() {
                patch = patch.platform(Some(platform));
            }
            if let Some(thumbnail) = thumbnail {
                patch = patch.thumbnail(thumbnail);
            }
            if patch.is_empty() {
                return Err(AppError::InvalidInput(
                    "Nothing to update: pass --name, --platform, --clear-platform or --thumbnail"
                        .to_string(),
                ));
            }

            let updated = catalog.update_media(record.id, patch).await?;
            print_json(&updated)?;
        }
        Commands::Delete { target } => {
            let record = resolve(&catalog, &target).await?;
            catalog.delete_media(record.id).await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("Media {} deleted", record.storage_location.key),
            }))?;
        }
        Commands::Usage { json } => {
            let usage = catalog.usage().await?;
            if json {
                print_json(&usage)?;
            } else {
                print_usage(&usage);
            }
        }
        Commands::Reconcile => {
            let count = catalog.reconcile().await?;
            println!("Rebuilt index with {} record(s)", count);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let mut telemetry = TelemetryConfig::from_config("mediacat-cli", &config);
    // Keep stdout for command output unless RUST_LOG asks for more.
    telemetry.default_filter = "mediacat=warn".to_string();
    init_telemetry(&telemetry)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let result = run(cli, &config).await;
    shutdown_telemetry().await;

    if let Err(error) = result {
        log_error(&error);
        let response = ErrorResponse::from_app_error(&error, config.is_production());
        eprintln!("{}", serde_json::to_string_pretty(&response)?);
        std::process::exit(1);
    }

    Ok(())
}
