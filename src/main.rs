use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dbaas_backup_adapter::core::{HashedNameGenerator, Orchestrator};
use dbaas_backup_adapter::daemon::{HttpTransport, WireContract};
use dbaas_backup_adapter::logging::{self, LogConfig};
use dbaas_backup_adapter::web::WebServer;
use dbaas_backup_adapter::{config, context};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dbaas-backup-adapter")]
#[command(about = "HTTP adapter in front of a database backup daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the backup/restore API
    Serve(ServerArgs),
    /// Print the resolved configuration and exit
    CheckConfig(ServerArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    daemon_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    bind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    app_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, value_enum)]
    wire_contract: Option<WireContract>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    json_logs: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => {
            let config = config::AppConfig::new(cli.config.as_deref(), Some(args))?;
            logging::init(LogConfig {
                json: config.json_logs,
                verbose: config.verbose,
            })?;
            run_server(config).await.context("Failed to run API server")?
        }
        Commands::CheckConfig(args) => {
            let config = config::AppConfig::new(cli.config.as_deref(), Some(args))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_server(config: config::AppConfig) -> Result<()> {
    let transport = HttpTransport::new(
        &config.daemon_url,
        Duration::from_secs(config.connect_timeout_secs),
    )?;
    let orchestrator = Orchestrator::new(
        Arc::new(transport),
        Arc::new(HashedNameGenerator::new(config.max_name_length)),
        config.wire_contract,
    );

    tracing::info!(
        daemon_url = %config.daemon_url,
        wire_contract = ?config.wire_contract,
        "Starting backup adapter"
    );

    let ctx = context::AppContext::new(config, orchestrator);
    let server = Arc::new(WebServer::new(ctx));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            signal_server.shutdown();
        }
    });

    server.start().await
}
