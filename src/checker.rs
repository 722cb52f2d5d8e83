//! # Checker — One Full Download Check
//!
//! Ties the pieces together for one invocation: resolve targets and tokens,
//! sweep, reconcile the observed report against the store, and read back the
//! active report. Runs are serialized: a second caller waits for the
//! in-flight check instead of sweeping concurrently.

use crate::directory::ObjectDirectory;
use crate::prom_metrics::{AccessGroupLabel, ActionLabel, Metrics, OutcomeLabel};
use crate::probe::{DownloadProber, ProbeConfig, ProbeSetup, SweepSummary};
use crate::report::{OutageReport, Reconciliation};
use crate::store::{self, ReportStore};
use crate::token::TokenIssuer;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of one check: what the sweep saw, what was written, and the
/// report that is active afterwards.
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub summary: SweepSummary,
    pub reconciliation: Reconciliation,
    pub active: Option<OutageReport>,
}

pub struct DownloadChecker {
    directory: Arc<dyn ObjectDirectory>,
    store: Arc<dyn ReportStore>,
    issuer: TokenIssuer,
    prober: DownloadProber,
    base_api_url: String,
    metrics: Arc<Metrics>,
    running: Mutex<()>,
}

impl DownloadChecker {
    pub fn new(
        directory: Arc<dyn ObjectDirectory>,
        store: Arc<dyn ReportStore>,
        issuer: TokenIssuer,
        config: &ProbeConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        Ok(DownloadChecker {
            directory,
            store,
            issuer,
            prober: DownloadProber::new(config)?,
            base_api_url: config.base_api_url.clone(),
            metrics,
            running: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn probe_count(&self) -> usize {
        self.prober.plan().len()
    }

    /// Sweep without touching the report store.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let _guard = self.running.lock().await;
        self.sweep_locked().await
    }

    /// Sweep, reconcile, and return the active report.
    pub async fn run(&self) -> Result<CheckRun> {
        let _guard = self.running.lock().await;
        let summary = self.sweep_locked().await?;

        let reconciliation = store::reconcile(self.store.as_ref(), &summary.report, Utc::now()).await?;
        self.metrics
            .report_actions
            .get_or_create(&ActionLabel {
                action: reconciliation.action().to_string(),
            })
            .inc();

        let active = self.store.get_active_report(self.prober.report_name()).await?;
        self.metrics.report_active.set(i64::from(active.is_some()));

        Ok(CheckRun {
            summary,
            reconciliation,
            active,
        })
    }

    async fn sweep_locked(&self) -> Result<SweepSummary> {
        let setup = ProbeSetup::prepare(
            self.directory.as_ref(),
            &self.issuer,
            &self.base_api_url,
            self.prober.plan(),
        )
        .await?;
        let summary = self.prober.sweep(&setup).await;
        self.observe(&summary);
        Ok(summary)
    }

    fn observe(&self, summary: &SweepSummary) {
        self.metrics.sweeps.inc();
        self.metrics
            .sweep_duration
            .observe(summary.duration.as_secs_f64());
        for result in &summary.results {
            self.metrics
                .probes
                .get_or_create(&OutcomeLabel {
                    outcome: result.outcome.label().to_string(),
                })
                .inc();
            if result.outcome.is_failure() {
                let group = result.descriptor.privilege.access_group().unwrap_or("none");
                self.metrics
                    .probe_failures
                    .get_or_create(&AccessGroupLabel {
                        access_group: group.to_string(),
                    })
                    .inc();
            }
        }
    }
}
