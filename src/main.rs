mod config;
mod domain;
mod market;
mod monitoring;
mod notifier;
mod scanner;
mod state;
mod strategy;
mod symbols;
mod time;

use anyhow::Result;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present (no-op under cron/CI where env is injected)
    let _ = dotenvy::dotenv();

    monitoring::init_tracing(config::env_bool("DEBUG", false));

    let cfg = match config::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "config");
            std::process::exit(2);
        }
    };
    info!(?cfg, "boot");

    scanner::run(cfg).await?;

    Ok(())
}
