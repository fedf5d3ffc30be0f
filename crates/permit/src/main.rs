//! Permit operator CLI and HTTP server.
//!
//! Usage:
//!   permit create example.com --trial
//!   permit list example
//!   permit api
//!
//! Storage location, listen address and secrets come from flags or the
//! environment; see `permit --help`.

use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use permit::api::{build_router, AppState, RATE_LIMIT_PRUNE_INTERVAL};
use permit::config::Settings;
use permit::logging::init_logging;
use permit::render::{details, summary_line};
use permit::{IssueRequest, PermitKind, Registry};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "permit")]
#[command(version, about = "Issue, store and verify software license permits")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List permits; QUERY matches a key prefix or part of a domain
    List { query: Option<String> },

    /// Show a single permit
    Get { key: String },

    /// Issue a new permit for DOMAIN
    Create {
        domain: String,

        /// Expire 14 days from tomorrow instead of a year
        #[arg(long, conflicts_with = "infinite")]
        trial: bool,

        /// Never expire
        #[arg(long)]
        infinite: bool,

        /// Use this key instead of a generated one
        #[arg(long, value_name = "KEY")]
        force_key: Option<String>,

        #[arg(long, default_value = "")]
        contact: String,

        #[arg(long, default_value = "")]
        entity: String,
    },

    /// Disable a permit
    Revoke { key: String },

    /// Re-enable a revoked permit
    Enable { key: String },

    /// Set a permit to expire MONTHS from now, or never with --infinite
    Extend {
        key: String,

        #[arg(required_unless_present = "infinite", conflicts_with = "infinite")]
        months: Option<u32>,

        #[arg(long)]
        infinite: bool,
    },

    /// Remove permits
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Serve the check and create endpoints
    Api,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.settings.log_level, cli.settings.log_pretty);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings;
    let registry = Registry::new(settings.open_keeper()?);

    match cli.command {
        Command::List { query } => {
            for permit in registry.list(query).await? {
                println!("{}", summary_line(&permit));
            }
        }
        Command::Get { key } => {
            let permit = registry.get(&key).await?;
            print!("{}", details(&permit));
        }
        Command::Create {
            domain,
            trial,
            infinite,
            force_key,
            contact,
            entity,
        } => {
            let kind = match (trial, infinite) {
                (true, _) => PermitKind::Trial,
                (_, true) => PermitKind::Infinite,
                _ => PermitKind::Standard,
            };
            let mut request = IssueRequest::new(domain)
                .kind(kind)
                .contact(contact)
                .entity(entity);
            request.key = force_key;

            let issued = registry.create(request).await?;
            print!("{}", details(&issued.permit));
        }
        Command::Revoke { key } => registry.revoke(&key).await?,
        Command::Enable { key } => registry.enable(&key).await?,
        Command::Extend {
            key,
            months,
            infinite,
        } => match months {
            Some(months) if !infinite => {
                let expires = registry.extend_months(&key, months).await?;
                println!("Extending permit to {expires}");
            }
            _ => {
                registry.extend_infinite(&key).await?;
                println!("Permit no longer expires");
            }
        },
        Command::Delete { keys } => registry.delete(keys.as_slice()).await?,
        Command::Api => serve(&settings, registry).await?,
    }

    Ok(())
}

async fn serve(settings: &Settings, registry: Registry) -> Result<()> {
    let config = settings.api_config()?;
    let state = AppState::new(registry.keeper(), &config);

    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("could not bind {}", settings.listen))?;
    let pruner = state.spawn_rate_limit_pruner(RATE_LIMIT_PRUNE_INTERVAL);
    let app = build_router(state);
    info!(addr = %settings.listen, "starting HTTP API server");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    pruner.abort();
    served.context("HTTP API server failed")?;

    info!("HTTP API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down HTTP API server"),
        Err(e) => {
            warn!(error = %e, "could not listen for ctrl-c; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
