//! ferryd - upload progress and share link service.
//!
//! Resolves the configured storage backend, then serves upload progress over
//! WebSocket and sweeps expired short links until interrupted.

use clap::Parser;
use ferry::{AppContext, FerryError, Result};
use ferry_config::{AppConfig, EnvLoader, load_dotenv};
use ferry_links::LinkSweeper;
use ferry_log::LogConfig;
use ferry_progress::{ProgressServer, ProgressServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Ferry upload service
#[derive(Parser, Debug)]
#[command(name = "ferryd")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "File upload service with live progress and expiring share links")]
struct Cli {
    /// Enable verbose output (debug level, mirrored to stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Storage type: ali-oss, minio or local (overrides OSS)
    #[arg(short, long, value_name = "TYPE")]
    storage: Option<String>,

    /// Settings file (TOML or JSON) used instead of the environment
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// .env file to load before reading the environment
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, fatal = e.is_startup_fatal(), "ferryd stopped");
            eprintln!("ferryd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dotenv = load_dotenv(cli.env_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    }
    .with_storage_override(cli.storage)
    .with_verbose(cli.verbose);

    let log_config = LogConfig::from_env()
        .with_log_dir(&config.log_dir)
        .with_verbose(config.verbose);
    let _log_guard = ferry_log::init(&log_config)?;

    info!(
        storage_type = %config.storage_type,
        dotenv = ?dotenv,
        log_file = ?log_config.log_file(),
        "Server starting"
    );

    let context = AppContext::from_config(&config, &EnvLoader::default())
        .await
        .inspect_err(|e| error!(error = %e, "Failed to initialize storage service"))?;

    let shutdown = CancellationToken::new();
    let server = ProgressServer::new(
        ProgressServerConfig::default()
            .bind_addr(config.progress_addr)
            .path(config.progress_path.clone()),
        Arc::clone(context.progress()),
    );
    let mut server_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { server.run(shutdown).await }
    });
    let sweeper = LinkSweeper::with_interval(Arc::clone(context.links()), config.sweep_interval).spawn();

    let outcome = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
        joined = &mut server_task => server_result(joined),
    };

    shutdown.cancel();
    sweeper.shutdown().await;
    if !server_task.is_finished() {
        let _ = server_result(server_task.await);
    }
    context.progress().clear_all();
    info!("Server stopped");

    outcome
}

fn server_result(
    joined: std::result::Result<ferry_progress::PushResult<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) => Err(FerryError::Io(std::io::Error::other(e))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
