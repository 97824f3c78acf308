use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deskctl_agent::client::ApiClient;
use deskctl_agent::config::AgentConfig;
use deskctl_agent::executor::Dispatcher;
use deskctl_agent::poller::Poller;

/// deskctl agent - executes remote commands on this machine
#[derive(Parser)]
#[command(name = "deskctl-agent")]
#[command(about = "Polls a deskctl server and executes media/volume/brightness commands", long_about = None)]
struct Cli {
    /// Path to the agent config file (default: ~/.config/deskctl/agent.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this machine with the server using a registration token
    Register {
        /// Single-use registration token issued by the owner
        token: String,

        /// Server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: String,

        /// Device name shown to the owner (default: this machine's hostname)
        #[arg(long)]
        name: Option<String>,
    },

    /// Start the polling daemon
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => AgentConfig::default_path()?,
    };

    match cli.command {
        Commands::Register {
            token,
            server,
            name,
        } => register(&config_path, &token, &server, name).await,
        Commands::Run => run(&config_path).await,
    }
}

async fn register(
    config_path: &std::path::Path,
    token: &str,
    server: &str,
    name: Option<String>,
) -> Result<()> {
    let name = name.unwrap_or_else(hostname);

    info!("Generating device key pair");
    let keys = shared::crypto::generate_key_pair().context("Key generation failed")?;

    let client = ApiClient::new(server);
    let response = client
        .activate(token, &keys.public_key_pem, &name)
        .await
        .context("Activation failed")?;

    let config = AgentConfig {
        device_id: response.device_id,
        server_url: server.to_string(),
        private_key_pem: keys.private_key_pem,
        poll_interval_ms: deskctl_agent::config::DEFAULT_POLL_INTERVAL_MS,
        enabled_modules: Default::default(),
    };
    config.save(config_path)?;

    info!(
        device_id = response.device_id,
        config = %config_path.display(),
        "Registered successfully"
    );
    Ok(())
}

async fn run(config_path: &std::path::Path) -> Result<()> {
    let config = AgentConfig::load(config_path)?;

    info!(
        device_id = config.device_id,
        server = %config.server_url,
        "Starting deskctl agent v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = ApiClient::new(&config.server_url);
    let dispatcher = Dispatcher::from_config(&config.enabled_modules);
    let poller = Poller::new(
        client,
        dispatcher,
        config.device_id,
        config.private_key_pem.clone(),
        Duration::from_millis(config.poll_interval_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Termination signal received; finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    poller.run(shutdown_rx).await;

    info!("Agent stopped");
    Ok(())
}

fn hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "desktop".to_string())
}
