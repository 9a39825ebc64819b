use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use reseed_core::config::{LoggingConfig, ReseedConfig};
use reseed_core::{logging, RetryPolicy};
use reseed_database::{DatabaseController, SharedConnection, SqliteConnector};
use reseed_scheduler::{RefreshJob, RefreshScheduler, Refresher};
use reseed_transfer::{build_provider, FileTransfer};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

mod shutdown;

/// Keep a live database in sync with an externally produced data file.
#[derive(Parser, Debug)]
#[command(name = "reseed", version, about)]
struct Cli {
    /// TOML config file (default: ./reseed.toml)
    #[arg(short, long, env = "RESEED_CONFIG")]
    config: Option<PathBuf>,
}

enum Stop {
    Signal(std::io::Result<&'static str>),
    Engine(Result<(), JoinError>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ReseedConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // No configured sink yet: report through the default log file.
            if let Err(log_err) = logging::init(&LoggingConfig::default().file) {
                eprintln!("failed to open log file: {log_err}");
            }
            error!("Fatal error during startup: {e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging.file) {
        eprintln!(
            "failed to open log file {}: {e}",
            config.logging.file.display()
        );
        return ExitCode::FAILURE;
    }
    logging::install_panic_hook();

    match run(config).await {
        Ok(()) => {
            info!("reseed stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ReseedConfig) -> anyhow::Result<()> {
    info!(
        database = %config.database.name,
        source = %config.source.file.display(),
        destination = %config.source.destination_file().display(),
        interval_ms = config.schedule.interval_ms,
        "reseed starting"
    );

    let connection = Arc::new(SharedConnection::new(SqliteConnector::new(
        config.connection.clone(),
    )));
    connection
        .client()
        .await
        .context("failed to connect to the database server")?;

    let retry = RetryPolicy::from(&config.retry);
    let database =
        DatabaseController::new(Arc::clone(&connection), config.database.name.clone(), retry);
    let snapshots = build_provider(&config.snapshot);
    info!(provider = snapshots.name(), "snapshot provider selected");
    let transfer =
        FileTransfer::new(snapshots, retry).with_verification(config.transfer.verify_copy);
    let refresher: Arc<dyn RefreshJob> =
        Arc::new(Refresher::new(database, transfer, &config.source));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut engine = tokio::spawn(
        RefreshScheduler::new(refresher, config.schedule.interval()).run(shutdown_rx),
    );

    let stop = tokio::select! {
        signal = shutdown::wait_for_signal() => Stop::Signal(signal),
        joined = &mut engine => Stop::Engine(joined),
    };
    let _ = shutdown_tx.send(true);

    let outcome = match stop {
        Stop::Signal(Ok(name)) => {
            info!("Received {name}, shutting down");
            if let Err(e) = engine.await {
                warn!("scheduler task ended abnormally: {e}");
            }
            Ok(())
        }
        Stop::Signal(Err(e)) => {
            engine.abort();
            Err(anyhow!(e).context("failed to install signal handlers"))
        }
        Stop::Engine(Err(e)) if e.is_panic() => Err(anyhow!("scheduler task aborted: {e}")),
        Stop::Engine(_) => Err(anyhow!("scheduler task stopped unexpectedly")),
    };

    if let Err(e) = connection.close().await {
        warn!("failed to close database connection: {e}");
    }
    outcome
}
