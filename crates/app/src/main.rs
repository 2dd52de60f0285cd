mod cli;
mod config;
mod http;
mod state;
mod wiring;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Mode};
use crate::config::ConfigError;
use crate::http::HttpError;
use crate::wiring::WiringError;
use comment_tree_infra::db::run_migrations;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid cli: {0}")]
    InvalidCli(String),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("db error: {0}")]
    Db(#[from] comment_tree_infra::db::DbPoolError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    config::load_dotenv()?;
    let config = config::AppConfig::from_env()?;
    if cli.mode == Mode::Migrate && config.database_url.is_none() {
        return Err(AppError::InvalidCli(
            "migrate mode requires COMMENT_TREE_DATABASE_URL".to_string(),
        ));
    }

    let state = wiring::build_state(config)?;
    match state.db.as_ref() {
        Some(pool) if !cli.skip_migrations || cli.mode == Mode::Migrate => {
            run_migrations(pool).await?;
            info!("database migrations applied");
        }
        Some(_) => warn!("skipping database migrations"),
        None => {}
    }

    if !cli.mode.run_api() {
        info!("migrations complete; exiting");
        return Ok(());
    }

    let addr = state.config.http_addr;
    let api = tokio::spawn(async move {
        info!(%addr, storage = state.comments.backend(), "http server starting");
        http::serve(addr, state).await
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        res = api => {
            res??;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
    }
}
