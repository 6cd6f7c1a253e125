pub mod cli;
pub mod core;
pub mod notifier;
pub mod providers;
pub mod scheduler;
pub mod server;

use crate::core::asset;
use crate::core::config::AppConfig;
use crate::core::pipeline::{AssetQuery, Pipeline};
use crate::providers::coinmarketcap::CoinMarketCapClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Digest { notify: bool },
    List { query: AssetQuery },
}

/// Loads the tracked list and builds the provider client. Fails when the
/// API key is missing.
pub fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let tracked = match &config.tracked_assets_path {
        Some(path) => asset::load_from_path(path)?,
        None => asset::load_bundled()?,
    };
    info!("Tracking {} assets", tracked.len());

    let client = CoinMarketCapClient::new(
        &config.provider.base_url,
        config.provider.api_key.as_deref(),
        config.provider_timeout(),
    )
    .context("Failed to create CoinMarketCap client")?;

    Ok(Pipeline::new(
        Arc::new(client),
        tracked,
        config.provider.metadata_source,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ATH diff starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let pipeline = build_pipeline(&config)?;

    match command {
        AppCommand::Serve => server::serve(&config, pipeline).await,
        AppCommand::Digest { notify } => cli::digest::run(&pipeline, &config, notify).await,
        AppCommand::List { query } => cli::list::run(&pipeline, &query).await,
    }
}
