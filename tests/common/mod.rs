//! Shared test helpers for integration tests.

#![allow(dead_code)]

pub mod mock_downloads;

use anyhow::{bail, Result};
use async_trait::async_trait;
use outage_probe::checker::DownloadChecker;
use outage_probe::directory::ObjectDirectory;
use outage_probe::probe::ProbeConfig;
use outage_probe::prom_metrics::Metrics;
use outage_probe::report::{OutageReport, OutageReportUpdates};
use outage_probe::store::ReportStore;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs the schema once per test suite).
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let db = outage_probe::db::Database::connect(&test_db_url())
                .await
                .unwrap();
            db.migrate().await.unwrap();
        });
    });
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> outage_probe::db::Database {
    ensure_schema();
    let db = outage_probe::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Truncate all tables to ensure test isolation.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql("TRUNCATE TABLE platform_outage_reports, learning_objects, users CASCADE")
        .execute(pool)
        .await
        .unwrap();
}

// ── In-memory report store ──────────────────────────────────────────

/// A write the store received, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Create(OutageReport),
    Update(String, OutageReportUpdates),
}

/// Report store held in memory. Enforces one active report per name, like
/// the partial unique index on the real table.
#[derive(Default)]
pub struct MemoryStore {
    reports: Mutex<Vec<OutageReport>>,
    writes: Mutex<Vec<StoreWrite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(report: OutageReport) -> Self {
        let store = Self::default();
        store.reports.lock().unwrap().push(report);
        store
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<OutageReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get_active_report(&self, name: &str) -> Result<Option<OutageReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name && r.resolved.is_none())
            .cloned())
    }

    async fn create_report(&self, report: &OutageReport) -> Result<()> {
        let mut reports = self.reports.lock().unwrap();
        if reports
            .iter()
            .any(|r| r.name == report.name && r.resolved.is_none())
        {
            bail!("active report for {} already exists", report.name);
        }
        reports.push(report.clone());
        self.writes
            .lock()
            .unwrap()
            .push(StoreWrite::Create(report.clone()));
        Ok(())
    }

    async fn update_active_report(
        &self,
        updates: &OutageReportUpdates,
        name: &str,
    ) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push(StoreWrite::Update(name.to_string(), updates.clone()));
        let mut reports = self.reports.lock().unwrap();
        if let Some(active) = reports
            .iter_mut()
            .find(|r| r.name == name && r.resolved.is_none())
        {
            if let Some(groups) = &updates.access_groups {
                active.access_groups = groups.clone();
            }
            if let Some(issues) = &updates.issues {
                active.issues = issues.clone();
            }
            if let Some(links) = &updates.links {
                active.links = links.clone();
            }
            if updates.resolved.is_some() {
                active.resolved = updates.resolved;
            }
        }
        Ok(())
    }
}

/// Report store whose every call fails, as if the database were down.
pub struct FailingStore;

#[async_trait]
impl ReportStore for FailingStore {
    async fn get_active_report(&self, _name: &str) -> Result<Option<OutageReport>> {
        bail!("report store offline")
    }

    async fn create_report(&self, _report: &OutageReport) -> Result<()> {
        bail!("report store offline")
    }

    async fn update_active_report(
        &self,
        _updates: &OutageReportUpdates,
        _name: &str,
    ) -> Result<()> {
        bail!("report store offline")
    }

    async fn health_check(&self) -> Result<()> {
        bail!("report store offline")
    }
}

// ── Checker wiring ──────────────────────────────────────────────────

pub fn probe_config(base_api_url: &str, timeout: Duration) -> ProbeConfig {
    let mut config = ProbeConfig::new(base_api_url);
    config.request_timeout = timeout;
    config
}

/// Checker against `base_api_url` using the mock service's token issuer.
pub fn build_checker(
    directory: Arc<dyn ObjectDirectory>,
    store: Arc<dyn ReportStore>,
    config: &ProbeConfig,
) -> DownloadChecker {
    DownloadChecker::new(
        directory,
        store,
        mock_downloads::issuer(),
        config,
        Arc::new(Metrics::new()),
    )
    .expect("Failed to build download checker")
}
