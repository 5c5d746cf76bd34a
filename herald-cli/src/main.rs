//! Herald CLI - participant side of the enrollment/delivery protocol

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use herald_cli::commands::{run_demo, run_enroll, run_send};
use herald_cli::Endpoints;
use herald_core::wire::{DEFAULT_HOST, DELIVERY_PORT, ENROLLMENT_PORT};
use herald_core::Identity;
use tracing_subscriber::EnvFilter;

/// Herald - enroll with an authority and deliver messages
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Authority host
    #[arg(long, env = "HERALD_HOST", default_value = DEFAULT_HOST, global = true)]
    host: String,

    /// Enrollment port
    #[arg(long, env = "HERALD_ENROLL_PORT", default_value_t = ENROLLMENT_PORT, global = true)]
    enroll_port: u16,

    /// Delivery port
    #[arg(long, env = "HERALD_DELIVER_PORT", default_value_t = DELIVERY_PORT, global = true)]
    deliver_port: u16,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll and print the identity and its token
    Enroll {
        /// Identity to enroll (random UUID if omitted)
        #[arg(long)]
        identity: Option<String>,
    },

    /// Enroll, then deliver each message in order
    Send {
        /// Messages to deliver
        #[arg(required = true)]
        messages: Vec<String>,

        /// Identity to send as (random UUID if omitted)
        #[arg(long)]
        identity: Option<String>,

        /// Skip enrollment; the authority will reject every message
        #[arg(long)]
        no_enroll: bool,
    },

    /// Walk through the protocol against a running authority
    Demo {
        /// Number of fresh participants after the scripted one
        #[arg(long, default_value_t = 10)]
        clients: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli).await;

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let endpoints = Endpoints {
        host: cli.host,
        enrollment_port: cli.enroll_port,
        delivery_port: cli.deliver_port,
    };

    match cli.command {
        Commands::Enroll { identity } => {
            let (identity, token) = run_enroll(&endpoints, identity.map(Identity::new)).await?;
            println!("identity: {identity}");
            println!("token:    {}", token.as_str());
            Ok(())
        }

        Commands::Send {
            messages,
            identity,
            no_enroll,
        } => {
            let report =
                run_send(&endpoints, identity.map(Identity::new), &messages, !no_enroll).await?;
            if !report.all_delivered() {
                bail!(
                    "{} of {} messages not delivered",
                    report.failed.len(),
                    messages.len()
                );
            }
            Ok(())
        }

        Commands::Demo { clients } => {
            let report = run_demo(&endpoints, clients).await?;
            println!(
                "tokenless send rejected: {}, delivered {}/{}",
                report.tokenless_rejected, report.delivered, report.attempted
            );
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
