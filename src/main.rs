mod app;
mod completion;
mod config;
mod http;

use crate::app::AppHandles;
use crate::config::API_KEY_ENV;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::log::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const VERSION: &str = env!("VERSION");

#[derive(Parser)]
#[command(name = "speech-relay")]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = VERSION)]
struct CliArguments {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// RUST_LOG wins, the configured level is only a fallback.
fn init_tracing(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log_level: {default_level}"))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("build version: {VERSION}");
    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();

    let args = CliArguments::parse();
    let config = config::AppConfig::load(args.config)?;
    init_tracing(config.log_level.as_deref().unwrap_or("info"))?;

    let api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("Missing required {API_KEY_ENV} environment variable!"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            let handles = AppHandles::new(config, &api_key)?;
            handles.run().await;
            Ok(())
        })
}
