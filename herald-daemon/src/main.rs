//! Herald Daemon - the authority participants enroll with and deliver to.

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use herald_daemon::{Authority, AuthorityConfig, ServeArgs};
use tokio::signal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Herald Daemon - enrollment and message delivery authority
#[derive(Parser)]
#[command(name = "herald-daemon", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the authority (default if no command given)
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Serve(args)) => args,
        None => cli.serve,
    };

    cmd_serve(args).await
}

/// Start both listeners and run until SIGINT/SIGTERM.
async fn cmd_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log_file().map(|p| p.as_path()))?;

    let config = AuthorityConfig::from(&args);
    let authority = Authority::bind(&config).await?;

    tracing::info!(
        enrollment = %authority.enrollment_addr(),
        delivery = %authority.delivery_addr(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        max_bindings = ?config.max_bindings,
        policy = ?config.malformed_policy,
        "Herald authority starting (dual-port)"
    );

    authority.serve(shutdown_signal()).await;

    tracing::info!("Authority shutdown complete");
    Ok(())
}

/// Terminal output plus an optional plain-text mirror in `log_file`.
fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        tracing::info!(path = %path.display(), "Mirroring log to file");
    }
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
