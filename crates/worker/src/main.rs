use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobroute_core::clock::SystemClock;
use jobroute_events::{BusNotificationDispatcher, EventBus, EventPersistence};
use jobroute_pipeline::adapters::postgres::postgres_ports;
use jobroute_worker::{Scheduler, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jobroute-worker")]
#[command(about = "Scheduled jobs for the job-routing engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the recurring-task scan and the assignment sync on their intervals
    Run,

    /// Advance every due recurring task once and exit
    RecurringTasks,

    /// Route entities created within the lookback window once and exit
    SyncAssignments,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobroute_worker=debug,jobroute_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = jobroute_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    jobroute_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let directory_pool = match std::env::var("DIRECTORY_DATABASE_URL") {
        Ok(url) if url != database_url => jobroute_db::create_pool(&url)
            .await
            .context("Failed to connect to directory database")?,
        _ => pool.clone(),
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    let notifier = Arc::new(BusNotificationDispatcher::new(Arc::clone(&event_bus)));
    let ports = postgres_ports(pool, directory_pool, notifier, Arc::new(SystemClock));
    let scheduler = Scheduler::new(ports, config);

    match cli.command {
        Command::Run => {
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                signal_cancel.cancel();
            });
            tracing::info!("Worker started");
            scheduler.run(cancel).await;
        }
        Command::RecurringTasks => {
            let summary = scheduler.run_recurring_tasks().await?;
            println!("{summary}");
        }
        Command::SyncAssignments => {
            let summary = scheduler.sync_assignments().await?;
            println!("{summary}");
        }
    }

    // Dropping the scheduler releases the dispatcher's bus handle, so the
    // channel closes once `event_bus` goes too.
    drop(scheduler);
    drop(event_bus);
    if tokio::time::timeout(Duration::from_secs(5), persistence_handle)
        .await
        .is_err()
    {
        tracing::warn!("Event persistence did not drain before exit");
    }

    tracing::info!("Worker stopped");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
