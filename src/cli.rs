use crate::server::{self, AppState};
use crate::utils::{format_bytes, format_duration};
use crate::{Config, ScreenshotService};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "screenshot-server")]
#[command(about = "Cached on-demand web screenshot service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Cache directory for captured artifacts")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, help = "Capture timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Maximum concurrent browser captures")]
    pub max_captures: Option<usize>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP screenshot service
    Serve {
        #[arg(short, long, default_value = "8080", help = "Server port")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1", help = "Bind address")]
        bind: String,
    },

    /// Capture a single URL to a file
    Single {
        #[arg(short, long, help = "URL to capture")]
        url: String,

        #[arg(short, long, help = "Output file path")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

pub struct CliRunner {
    pub config: Config,
    pub service: Arc<ScreenshotService>,
}

impl CliRunner {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let service = Arc::new(ScreenshotService::new(config.clone()).await?);
        Ok(Self { config, service })
    }

    pub async fn run(
        &self,
        command: Commands,
        prometheus: Option<PrometheusHandle>,
    ) -> anyhow::Result<()> {
        match command {
            Commands::Serve { port, bind } => self.run_serve(&bind, port, prometheus).await,
            Commands::Single { url, output } => self.run_single(&url, &output).await,
            Commands::Validate { config } => self.validate_config(&config).await,
        }
    }

    async fn run_serve(
        &self,
        bind: &str,
        port: u16,
        prometheus: Option<PrometheusHandle>,
    ) -> anyhow::Result<()> {
        let state = AppState {
            service: self.service.clone(),
            prometheus,
        };
        let addr = format!("{bind}:{port}");

        server::serve(state, &addr, shutdown_signal()).await?;
        info!("screenshot server stopped");
        Ok(())
    }

    async fn run_single(&self, url: &str, output: &PathBuf) -> anyhow::Result<()> {
        info!("capturing {}", url);
        let started = Instant::now();

        let bytes = self.service.get_screenshot(url).await?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(output, &bytes).await?;

        println!("Screenshot captured successfully:");
        println!("  URL: {url}");
        println!("  Output: {}", output.display());
        println!("  Size: {}", format_bytes(bytes.len()));
        println!("  Duration: {}", format_duration(started.elapsed()));

        Ok(())
    }

    async fn validate_config(&self, config_path: &PathBuf) -> anyhow::Result<()> {
        println!("Validating configuration: {}", config_path.display());

        let config_content = fs::read_to_string(config_path).await?;
        let config: Config = serde_json::from_str(&config_content)?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;

        println!("Configuration is valid:");
        println!("  Listen address: {}", config.listen_addr);
        println!("  Cache directory: {}", config.cache_dir.display());
        println!("  Cache TTL: {:?}", config.cache_ttl);
        println!("  Capture timeout: {:?}", config.capture_timeout);
        println!("  Max concurrent captures: {}", config.max_concurrent_captures);
        println!(
            "  Viewport: {}x{}",
            config.viewport.width, config.viewport.height
        );

        Ok(())
    }
}

async fn shutdown_signal() {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to create SIGINT handler");
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to create SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {
            info!("received SIGINT");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM");
        }
    }
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    Ok(())
}
