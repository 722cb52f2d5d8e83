//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the download check and its HTTP server.
//!
//! ## Subcommands
//!
//! - `serve`: HTTP server; every `GET /downloads` runs one check.
//! - `sweep`: run one check from the command line and print the outcome.
//! - `token`: mint a bearer token for one of the fixture requesters.
//! - `plan`: print the probe table with expected status codes.
//! - `migrate`: create the report and directory tables.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL holding reports and objects.
//! - `--base-api-url` / `BASE_API_URL`: download API the probes target.
//! - `--signing-key` / `TOKEN_SIGNING_KEY`, `--issuer` / `TOKEN_ISSUER`,
//!   `--audience` / `TOKEN_AUDIENCE`: bearer token parameters.
//! - `--probe-timeout-ms` / `PROBE_TIMEOUT_MS`: per-request timeout.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use outage_probe::report::DOWNLOADS_REPORT;
use outage_probe::token::DEFAULT_AUDIENCE;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "outage-probe",
    about = "Probe download permissions and track outage reports"
)]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Base URL of the download API (e.g. https://api.example.org)
    #[arg(long, env = "BASE_API_URL")]
    base_api_url: Option<String>,

    /// HS256 key used to sign requester tokens
    #[arg(long, env = "TOKEN_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Issuer claim of requester tokens
    #[arg(long, env = "TOKEN_ISSUER")]
    issuer: Option<String>,

    /// Audience claim of requester tokens
    #[arg(long, env = "TOKEN_AUDIENCE", default_value = DEFAULT_AUDIENCE)]
    audience: String,

    /// Per-request timeout for each probe, in milliseconds
    #[arg(long, env = "PROBE_TIMEOUT_MS", default_value_t = 5_000)]
    probe_timeout_ms: u64,

    /// Subsystem name outage reports are filed under
    #[arg(long, default_value = DOWNLOADS_REPORT)]
    report_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /downloads, /healthz, /readyz and /metrics
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 4800)]
        port: u16,
    },
    /// Run one download check and print the resulting report
    Sweep {
        /// Probe only; do not create, update or resolve reports
        #[arg(long)]
        dry_run: bool,
    },
    /// Mint a bearer token for a fixture requester
    Token {
        /// Which requester to sign for
        #[arg(long, value_enum)]
        user: FixtureUser,
    },
    /// Print the probe table and expected status codes
    Plan,
    /// Create the outage report and directory tables if missing
    Migrate,
}

#[derive(Clone, Copy, ValueEnum)]
enum FixtureUser {
    Regular,
    Reviewer,
    Curator,
    Editor,
    Admin,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shipping, human-readable otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port } => cli::run_serve(&cli, *port),
        Commands::Sweep { dry_run } => cli::run_sweep(&cli, *dry_run),
        Commands::Token { user } => cli::run_token(&cli, *user),
        Commands::Plan => cli::run_plan(),
        Commands::Migrate => cli::run_migrate(&cli),
    }
}
