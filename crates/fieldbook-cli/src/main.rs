//! Fieldbook - terminal reports for congregation field service records.
//!
//! Reads the local document store (see `fieldbook import`) and prints the
//! monthly views: summary, pending and irregular publishers, consolidated
//! totals, the service-year chart and the watch roster.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fieldbook_core::{Config, Month, MonthYear, ReportFilter};

#[derive(Parser)]
#[command(author, version, about = "Congregation field service reports")]
struct Cli {
    /// Calendar year (defaults to the year of the previous month)
    #[arg(long, global = true)]
    year: Option<i32>,
    /// Month name or number (defaults to the previous month)
    #[arg(long, global = true)]
    month: Option<Month>,
    /// Service group; all groups when omitted
    #[arg(long, global = true)]
    group: Option<String>,
    /// Months in the irregular window
    #[arg(long, global = true)]
    window: Option<usize>,
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load an export file into the local store
    Import { file: PathBuf },
    /// Show store location, record counts and freshness
    Status,
    /// Monthly totals per bucket plus window headcounts
    Summary,
    /// Active publishers without a report for the month
    Pending,
    /// Publishers missing at least one month of the window
    Irregular,
    /// Publishers who stopped reporting this month
    Inactive,
    /// Totals per group and for the congregation
    Consolidated,
    /// Twelve-month service-year series ending at the month
    Chart,
    /// Monthly report grid for the group
    Report,
    /// Edit one publisher's report for the month
    Record {
        /// Publisher id or part of the name
        publisher: String,
        #[arg(long)]
        participated: Option<bool>,
        #[arg(long)]
        auxiliary: Option<bool>,
        #[arg(long)]
        hours: Option<String>,
        #[arg(long)]
        courses: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approved auxiliary pioneer applications covering the month
    Applications,
    /// Watch roster for the month
    Watch,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Month before today, the usual month being reported.
fn default_period() -> MonthYear {
    let today = Local::now().date_naive();
    match Month::from_number(today.month()) {
        Some(month) => MonthYear::new(month, today.year()).pred(),
        None => MonthYear::new(Month::January, today.year()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;

    let fallback = default_period();
    let filter = ReportFilter::new(
        cli.month.unwrap_or(fallback.month),
        cli.year.unwrap_or(fallback.year),
    )
    .with_group(cli.group.clone().or_else(|| config.default_group.clone()));
    let window = cli.window.map(|w| w.max(1)).unwrap_or_else(|| config.window());

    let ctx = commands::Context::open(config, filter, window, cli.json).await?;
    info!(period = %ctx.filter.period(), group = ?ctx.filter.group(), "Running command");

    match cli.cmd {
        Command::Import { file } => commands::import(&ctx, &file).await,
        Command::Status => commands::status(&ctx).await,
        Command::Summary => commands::summary(&ctx).await,
        Command::Pending => commands::pending(&ctx).await,
        Command::Irregular => commands::irregular(&ctx).await,
        Command::Inactive => commands::inactive(&ctx).await,
        Command::Consolidated => commands::consolidated(&ctx).await,
        Command::Chart => commands::chart(&ctx).await,
        Command::Report => commands::report(&ctx).await,
        Command::Record {
            publisher,
            participated,
            auxiliary,
            hours,
            courses,
            notes,
        } => {
            let edit = commands::RecordEdit {
                participated,
                auxiliary,
                hours,
                courses,
                notes,
            };
            commands::record(&ctx, &publisher, edit).await
        }
        Command::Applications => commands::applications(&ctx).await,
        Command::Watch => commands::watch(&ctx).await,
    }
}
