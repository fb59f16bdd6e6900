use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// ── Shared settings ────────────────────────────────────────────────────────────

/// Settings common to the CLI and the server
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding customers.csv, subscriptions.csv and transactions.csv
    #[arg(long, global = true, env = "ARR_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Logging level
    #[arg(
        long,
        global = true,
        env = "ARR_LOG_LEVEL",
        default_value = "INFO",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"]
    )]
    pub log_level: String,
}

/// Optional `YYYY-MM` bounds; missing bounds default to the data span
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First month of the report (YYYY-MM)
    #[arg(long)]
    pub from: Option<String>,

    /// Last month of the report (YYYY-MM)
    #[arg(long)]
    pub to: Option<String>,
}

// ── CLI ────────────────────────────────────────────────────────────────────────

/// ARR rollforward metrics from CSV exports
#[derive(Parser, Debug, Clone)]
#[command(name = "arr-dashboard", version)]
pub struct Cli {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Monthly ARR rollforward (waterfall) table
    Report {
        #[command(flatten)]
        range: RangeArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Ending ARR by customer segment for one month
    Segments {
        /// Month to break down (YYYY-MM); defaults to the last month of data
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Headline KPIs for the last month of the range
    Kpis {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        json: bool,
    },
    /// Recognized revenue per month from transactions
    Revenue {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        json: bool,
    },
    /// Data quality and rollforward reconciliation checks
    Validate {
        #[arg(long)]
        json: bool,
    },
}

// ── Server ─────────────────────────────────────────────────────────────────────

/// Read-only JSON API and dashboard for ARR metrics
#[derive(Parser, Debug, Clone)]
#[command(name = "arr-server", version)]
pub struct ServerSettings {
    #[command(flatten)]
    pub data: DataArgs,

    /// Address to listen on
    #[arg(long, env = "ARR_BIND", default_value = "0.0.0.0:8001")]
    pub bind: String,

    /// Directory served under /static
    #[arg(long, env = "ARR_WEB_DIR", default_value = "web")]
    pub web_dir: PathBuf,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
