//! TaskNest
//!
//! A nested task list manager: SQLite storage, server-rendered HTML, and a
//! small client script for folding and inline editing.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tasknest::cli::{Cli, Command, tree};
use tasknest::config::Config;
use tasknest::db::Database;
use tasknest::logging::{self, LogTarget};
use tasknest::web;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref())?;

    // Override settings from CLI arguments
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.clone();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Command::Tree(args)) => {
            let db = open_database(&config)?;
            let stdout = std::io::stdout();
            tree::run(&db, &args, config.ui.collapsed_by_default, &mut stdout.lock())?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    info!("Database: {:?}", config.server.db_path);
    Ok(db)
}

/// Serve until Ctrl-C, then shut down gracefully.
async fn run_server(config: Config) -> Result<()> {
    let db = Arc::new(open_database(&config)?);
    let handle = web::start_server(db, &config.server, Arc::new(config.ui.clone())).await?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping");
    handle.shutdown().await;

    Ok(())
}
