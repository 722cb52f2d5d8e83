//! # Store — Outage Report Persistence Contract
//!
//! The [`ReportStore`] trait is the read/write contract for outage reports.
//! Reports are keyed by `{name, resolved IS NULL}`: at most one active
//! report exists per subsystem name. [`crate::db::Database`] implements it
//! against PostgreSQL.

use crate::report::{plan_reconciliation, OutageReport, OutageReportUpdates, Reconciliation};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// The unresolved report for `name`, if any.
    async fn get_active_report(&self, name: &str) -> Result<Option<OutageReport>>;

    async fn create_report(&self, report: &OutageReport) -> Result<()>;

    /// Merge `updates` into the unresolved report for `name`.
    async fn update_active_report(&self, updates: &OutageReportUpdates, name: &str)
        -> Result<()>;

    /// Connectivity check used by the readiness probe.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Fold a sweep's `observed` report into the store, performing at most one
/// write. Returns the action that was taken.
pub async fn reconcile(
    store: &dyn ReportStore,
    observed: &OutageReport,
    now: DateTime<Utc>,
) -> Result<Reconciliation> {
    let active = store.get_active_report(&observed.name).await?;
    let plan = plan_reconciliation(active.as_ref(), observed, now);

    match &plan {
        Reconciliation::Create(report) => store.create_report(report).await?,
        Reconciliation::Update(updates) | Reconciliation::Resolve(updates) => {
            store.update_active_report(updates, &observed.name).await?
        }
        Reconciliation::Nothing | Reconciliation::Unchanged => {}
    }

    info!(
        report = %observed.name,
        action = plan.action(),
        issues = observed.issues.len(),
        "outage report reconciled"
    );
    Ok(plan)
}
