// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dealmail - throttled marketing campaign scheduler and dispatcher.
//!
//! This is the binary entry point. Each invocation loads configuration,
//! opens the queue store, runs one job, and closes the store again.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod dispatch;
mod schedule;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dealmail_campaign::{JobContext, JsonlCandidateSource};
use dealmail_config::DealmailConfig;
use dealmail_core::DealmailError;
use dealmail_mailer::SendGridTransport;
use dealmail_storage::SqliteStore;
use tracing::warn;

/// Exit status when a dispatch batch was only partly confirmed.
const EXIT_PARTIAL: i32 = 3;

/// Dealmail - throttled marketing campaign scheduler and dispatcher.
#[derive(Parser, Debug)]
#[command(name = "dealmail", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file (plus DEALMAIL_* variables) only.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Evaluate as of this RFC 3339 instant instead of the current time.
    #[arg(long, global = true, value_name = "INSTANT")]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen the audience and queue sends for every campaign.
    Schedule {
        /// Only schedule this campaign.
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Send queue entries that are due.
    Dispatch {
        /// Keep dispatching while batches come back full and fully confirmed.
        #[arg(long)]
        drain: bool,
        /// List due entries without sending.
        #[arg(long)]
        dry_run: bool,
    },
    /// Schedule every campaign, then drain dispatch.
    Run,
    /// Show queue and sent-ledger counts per campaign.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Manage Dealmail configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate configuration, then print a summary.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => dealmail_config::load_and_validate_path(path),
        None => dealmail_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            dealmail_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.job.log_level);
    let now = cli.now.unwrap_or_else(Utc::now);

    let result = match cli.command {
        Commands::Config {
            action: ConfigCommands::Check,
        } => {
            print_config_summary(&config);
            Ok(())
        }
        command => run_job(command, config, now).await,
    };

    if let Err(e) = result {
        let code = match &e {
            DealmailError::PartialDelivery { .. } => EXIT_PARTIAL,
            _ => 1,
        };
        eprintln!("dealmail: {e}");
        std::process::exit(code);
    }
}

/// Open the collaborators, run one job, and close the store whatever the outcome.
async fn run_job(
    command: Commands,
    config: DealmailConfig,
    now: DateTime<Utc>,
) -> Result<(), DealmailError> {
    let needs_transport = matches!(
        command,
        Commands::Run | Commands::Dispatch { dry_run: false, .. }
    );
    let ctx = open_context(config, needs_transport).await?;

    let result = match command {
        Commands::Schedule { campaign } => {
            schedule::run_schedule(&ctx, campaign.as_deref(), now).await
        }
        Commands::Dispatch { drain, dry_run } => {
            dispatch::run_dispatch(&ctx, drain, dry_run, now).await
        }
        Commands::Run => {
            schedule::run_schedule(&ctx, None, now).await?;
            dispatch::run_dispatch(&ctx, true, false, now).await
        }
        Commands::Status { json, plain } => status::run_status(&ctx, json, plain, now).await,
        Commands::Config { .. } => Ok(()),
    };

    let closed = ctx.close().await;
    result?;
    closed
}

async fn open_context(
    config: DealmailConfig,
    needs_transport: bool,
) -> Result<JobContext, DealmailError> {
    let transport = if needs_transport {
        Some(Arc::new(SendGridTransport::new(&config.mail)?))
    } else {
        None
    };
    let candidates = Arc::new(JsonlCandidateSource::new(&config.input.users_path));
    let store = Arc::new(SqliteStore::open(&config.storage).await?);

    let ctx = match JobContext::new(config, store.clone(), candidates) {
        Ok(ctx) => ctx,
        Err(e) => {
            if let Err(close_err) = store.database().close().await {
                warn!(error = %close_err, "failed to close the store");
            }
            return Err(e);
        }
    };
    Ok(match transport {
        Some(transport) => ctx.with_transport(transport),
        None => ctx,
    })
}

fn print_config_summary(config: &DealmailConfig) {
    println!("dealmail: configuration is valid");
    println!("  database:  {}", config.storage.database_path);
    println!(
        "  calendar:  {} at {:02}:00",
        config.job.timezone, config.job.send_hour
    );
    for campaign in &config.campaigns {
        println!(
            "  campaign:  {} ({}, {}/day, {}/slot every {}h)",
            campaign.name,
            campaign.audience,
            campaign.max_per_day,
            campaign.max_per_hour,
            campaign.hour_gap_hours
        );
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dealmail={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_dispatch_flags() {
        let cli = Cli::try_parse_from(["dealmail", "dispatch", "--drain"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Dispatch {
                drain: true,
                dry_run: false
            }
        ));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "dealmail",
            "schedule",
            "--campaign",
            "yearly",
            "--config",
            "/tmp/dealmail.toml",
            "--now",
            "2026-03-09T14:30:00Z",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/dealmail.toml")));
        assert_eq!(
            cli.now.map(|n| n.to_rfc3339()),
            Some("2026-03-09T14:30:00+00:00".to_string())
        );
        assert!(matches!(
            cli.command,
            Commands::Schedule { campaign: Some(ref c) } if c == "yearly"
        ));
    }

    #[test]
    fn config_check_is_a_nested_subcommand() {
        let cli = Cli::try_parse_from(["dealmail", "config", "check"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Check
            }
        ));
    }
}
