mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use pitstop_gateway::{build_router, AppState};
use pitstop_ocr::{WorkflowConfig, WorkflowOcrClient};
use pitstop_storage::ServiceStore;

use config::Config;

#[derive(Parser)]
#[command(name = "pitstop")]
#[command(about = "Pitstop — car-service booking backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Pitstop API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show whether a local server is running
    Status,
    /// Send an image through the recognition workflow and print the fields
    OcrTest {
        /// Path to a certificate photo
        image: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("Pitstop is not running on port {}", config.port);
                }
            }
        }
        Commands::OcrTest { image } => {
            ocr_test(&config, &image).await?;
        }
    }

    Ok(())
}

/// Build the workflow client when both the URL and the secret are set.
fn workflow_client(config: &Config) -> Option<WorkflowOcrClient> {
    match (&config.workflow_url, &config.workflow_secret) {
        (Some(url), Some(secret)) if !url.is_empty() && !secret.is_empty() => {
            let mut workflow = WorkflowConfig::new(url, secret);
            if let Some(api_key) = &config.vision_api_key {
                workflow = workflow.with_api_key(api_key);
            }
            if let Some(folder_id) = &config.vision_folder_id {
                workflow = workflow.with_folder_id(folder_id);
            }
            if let Some(template) = &config.workflow_status_template {
                workflow = workflow.with_status_url_template(template);
            }
            Some(WorkflowOcrClient::new(workflow))
        }
        _ => None,
    }
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        "Starting Pitstop API"
    );

    let store = ServiceStore::open(&config.db_path)?;
    let ocr = workflow_client(&config);
    if ocr.is_none() {
        warn!("WORKFLOW_OCR_URL/WORKFLOW_OCR_SECRET not set, certificate recognition disabled");
    }

    let state = Arc::new(AppState { store, ocr });
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Pitstop API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Offline smoke test for the workflow: read a photo, run one full
/// recognition, print the normalized fields.
async fn ocr_test(config: &Config, image: &Path) -> Result<()> {
    let client = workflow_client(config)
        .context("WORKFLOW_OCR_URL and WORKFLOW_OCR_SECRET must be set")?;

    let bytes = std::fs::read(image)
        .with_context(|| format!("Failed to read {}", image.display()))?;
    println!("Submitting {} bytes to the workflow...", bytes.len());

    match client.recognize(&STANDARD.encode(&bytes)).await {
        Ok(fields) => println!("{}", serde_json::to_string_pretty(&fields)?),
        Err(err) => {
            println!("Recognition failed: {err}");
            std::process::exit(1);
        }
    }
    Ok(())
}
