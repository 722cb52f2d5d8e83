//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand.

use anyhow::{anyhow, Result};
use outage_probe::checker::DownloadChecker;
use outage_probe::db::Database;
use outage_probe::probe::{download_plan, ProbeConfig};
use outage_probe::prom_metrics::Metrics;
use outage_probe::server::{self, AppState};
use outage_probe::token::{Requester, TokenIssuer};
use outage_probe::users;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{Cli, FixtureUser};

fn required<'a>(value: &'a Option<String>, what: &str, env: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{} is required (set via --{} or {})", env, what, env))
}

fn token_issuer(cli: &Cli) -> Result<TokenIssuer> {
    let key = required(&cli.signing_key, "signing-key", "TOKEN_SIGNING_KEY")?;
    let issuer = required(&cli.issuer, "issuer", "TOKEN_ISSUER")?;
    Ok(TokenIssuer::new(key, issuer, &cli.audience))
}

fn probe_config(cli: &Cli) -> Result<ProbeConfig> {
    let base_api_url = required(&cli.base_api_url, "base-api-url", "BASE_API_URL")?;
    let mut config = ProbeConfig::new(base_api_url);
    config.report_name = cli.report_name.clone();
    config.request_timeout = Duration::from_millis(cli.probe_timeout_ms);
    Ok(config)
}

async fn connect(cli: &Cli) -> Result<Database> {
    let database_url = required(&cli.database_url, "database-url", "DATABASE_URL")?;
    Database::connect(database_url).await
}

async fn build_checker(cli: &Cli) -> Result<(DownloadChecker, ProbeConfig)> {
    let config = probe_config(cli)?;
    let issuer = token_issuer(cli)?;
    let database = Arc::new(connect(cli).await?);
    let checker = DownloadChecker::new(
        database.clone(),
        database,
        issuer,
        &config,
        Arc::new(Metrics::new()),
    )?;
    Ok((checker, config))
}

pub fn run_serve(cli: &Cli, port: u16) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (checker, config) = build_checker(cli).await?;
        let state = AppState::new(checker, config.request_timeout);
        server::run(port, state).await
    })
}

pub fn run_sweep(cli: &Cli, dry_run: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (checker, _) = build_checker(cli).await?;
        if dry_run {
            let summary = checker.sweep().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        let run = checker.run().await?;
        info!(
            action = run.reconciliation.action(),
            failed = run.summary.failed(),
            "download check complete"
        );
        let active = match run.active {
            Some(report) => serde_json::to_value(report)?,
            None => serde_json::json!({}),
        };
        println!("{}", serde_json::to_string_pretty(&active)?);
        Ok(())
    })
}

fn fixture(user: FixtureUser) -> Requester {
    match user {
        FixtureUser::Regular => users::regular_user(),
        FixtureUser::Reviewer => users::reviewer_user(),
        FixtureUser::Curator => users::curator_user(),
        FixtureUser::Editor => users::editor_user(),
        FixtureUser::Admin => users::admin_user(),
    }
}

pub fn run_token(cli: &Cli, user: FixtureUser) -> Result<()> {
    let issuer = token_issuer(cli)?;
    println!("{}", issuer.issue(&fixture(user))?);
    Ok(())
}

pub fn run_plan() -> Result<()> {
    for descriptor in download_plan() {
        println!(
            "{:<16} {:<28} {}  {}",
            descriptor.privilege.to_string(),
            descriptor.target.to_string(),
            descriptor.expected_status,
            descriptor.description
        );
    }
    Ok(())
}

pub fn run_migrate(cli: &Cli) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let database = connect(cli).await?;
        database.migrate().await?;
        info!("schema applied");
        Ok(())
    })
}
