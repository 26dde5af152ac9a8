use anyhow::Result;
use boomer_oracle::application::{Cli, CommandExecutor};
use boomer_oracle::shared::config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // An explicit --config must exist; the default file is optional
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    debug!("Loaded config: {:?}", config);

    CommandExecutor::execute(cli, config).await?;
    Ok(())
}
