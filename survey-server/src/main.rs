//! survey-server - survey collection service
//!
//! Resolves configuration (CLI, environment, TOML file, defaults), opens the
//! SQLite store and serves the HTTP API until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use survey_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use survey_common::db::init_database;
use survey_server::recommender::Recommender;
use survey_server::{build_router, db, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MODULE_NAME: &str = "survey-server";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "survey-server")]
#[command(about = "Survey collection and export service")]
#[command(version)]
struct Args {
    /// HTTP port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Data folder holding the database and export artifact
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frontend directory served at /
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref(), MODULE_NAME)
        .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting survey-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml_root(config.root_folder.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    if initializer.database_exists() {
        info!("Database path: {}", db_path.display());
    } else {
        info!("Database path: {} (will be created)", db_path.display());
    }

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Database initialization failed");
        }
    };

    match db::count_surveys(&pool).await {
        Ok(n) => info!("{} stored responses", n),
        Err(e) => warn!("Could not count stored responses: {}", e),
    }

    let recommender = Recommender::new(&config.recommender, initializer.export_path());
    info!(
        program = %config.recommender.program,
        artifact = %recommender.artifact_path().display(),
        "Recommender configured"
    );

    let static_dir = args.static_dir.or_else(|| config.static_dir.clone());
    match &static_dir {
        Some(dir) if dir.is_dir() => info!("Serving frontend from {}", dir.display()),
        Some(dir) => warn!("Static directory {} does not exist", dir.display()),
        None => info!("No static directory configured; serving API only"),
    }

    let state = AppState::new(pool, recommender, static_dir);
    let app = build_router(state);

    let defaults = CompiledDefaults::for_current_platform();
    let bind = args
        .bind
        .or_else(|| config.bind.clone())
        .unwrap_or(defaults.bind);
    let port = args.port.or(config.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("survey-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
