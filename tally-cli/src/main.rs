//! Tally CLI - organization financial reports in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{demo, export, kpis, report, series};

/// Tally - income, expense and membership reporting
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Organization (tenant) to report on
    #[arg(long, global = true, env = "TALLY_TENANT")]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show KPIs for a period compared with the previous one
    Kpis {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// End the default window now instead of at the end of today
        #[arg(long)]
        until_now: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the monthly series for a year
    Series {
        /// Calendar year (defaults to the current year)
        #[arg(long)]
        year: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a module report
    Report {
        /// Module key (members, attendance, tithes, offerings, welfare, projects, expenses, pledges)
        module: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a module report as a document or workbook
    Export {
        /// Module key
        module: String,
        /// Output format (pdf, excel)
        #[arg(long)]
        format: String,
        /// Comma-separated column keys
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Where to write the file (defaults to the generated name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Seed sample data for the tenant
    Demo {
        /// Year to generate (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let tenant = cli.tenant.as_deref();
    match cli.command {
        Commands::Kpis { from, to, until_now, json } => {
            kpis::run(tenant, from.as_deref(), to.as_deref(), until_now, json).await
        }
        Commands::Series { year, json } => series::run(tenant, year.as_deref(), json).await,
        Commands::Report { module, from, to, json } => {
            report::run(tenant, &module, from.as_deref(), to.as_deref(), json).await
        }
        Commands::Export { module, format, fields, from, to, output } => {
            export::run(
                tenant,
                &module,
                &format,
                fields.as_deref(),
                from.as_deref(),
                to.as_deref(),
                output,
            )
            .await
        }
        Commands::Demo { year } => demo::run(tenant, year),
    }
}
