use anyhow::Context;
use clap::Parser;
use screenshot_server::{metrics, setup_logging, Cli, CliRunner, Config};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    info!("starting screenshot-server v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    let prometheus = metrics::install_recorder();
    metrics::describe();

    let runner = CliRunner::new(config).await?;
    runner.run(args.command, prometheus).await
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        let config_content = tokio::fs::read_to_string(config_path)
            .await
            .with_context(|| format!("reading config file {}", config_path.display()))?;
        serde_json::from_str(&config_content)
            .with_context(|| format!("parsing config file {}", config_path.display()))?
    } else {
        Config::default()
    };

    // CLI arguments override file values
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(timeout) = args.timeout {
        config.capture_timeout = Duration::from_secs(timeout);
    }
    if let Some(max_captures) = args.max_captures {
        config.max_concurrent_captures = max_captures;
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!("configuration loaded");
    info!("cache directory: {}", config.cache_dir.display());
    info!("cache TTL: {:?}", config.cache_ttl);
    info!("capture timeout: {:?}", config.capture_timeout);
    info!("max concurrent captures: {}", config.max_concurrent_captures);

    Ok(config)
}
