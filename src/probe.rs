//! # Probe — Sequential Download Permission Sweep
//!
//! Walks the declarative probe table ([`plan::download_plan`]) one entry at a
//! time, downloading each target as each requester and comparing the
//! observed status code to the expected one. Every deviation is folded into
//! a single [`OutageReport`] so one sweep captures every broken permission
//! boundary at once.
//!
//! ## Sweep Lifecycle
//!
//! ```text
//! ProbeSetup::prepare
//!   ├─ one directory lookup per distinct target  → download URI (or skip)
//!   └─ one token per authenticated privilege
//! DownloadProber::sweep
//!   └─ for each descriptor, in plan order:
//!        no URI              → Skipped
//!        status == expected  → Passed
//!        status != expected  → Mismatch   ┐
//!        transport error     → Transport  ┴─ record issue, group, link
//! ```
//!
//! The sweep never aborts and never retries: a timed-out or refused request
//! counts as a failure for that probe and the sweep moves on. Each probe
//! builds its own request from the descriptor, so nothing is shared between
//! probes except the report builder owned by the sweep.

pub mod plan;

pub use plan::{
    download_plan, Collection, Privilege, ProbeDescriptor, ProbeTarget, HOME_COLLECTION,
    OTHER_COLLECTION,
};

use crate::directory::{download_uri, ObjectDirectory};
use crate::report::{OutageReport, ReportBuilder, DOWNLOADS_REPORT};
use crate::token::TokenIssuer;
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Base URL of the download API, e.g. `https://api.example.org`.
    pub base_api_url: String,
    /// Subsystem name the sweep's report is filed under.
    pub report_name: String,
    pub request_timeout: Duration,
}

impl ProbeConfig {
    pub fn new(base_api_url: &str) -> Self {
        ProbeConfig {
            base_api_url: base_api_url.to_string(),
            report_name: DOWNLOADS_REPORT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// URIs and tokens resolved once before a sweep.
#[derive(Debug, Clone, Default)]
pub struct ProbeSetup {
    uris: HashMap<ProbeTarget, String>,
    tokens: HashMap<Privilege, String>,
}

impl ProbeSetup {
    /// Resolve every target used by `plan` into a download URI and mint a
    /// token for every authenticated privilege in it. Targets the directory
    /// has no object for are left unresolved; their probes will be skipped.
    pub async fn prepare(
        directory: &dyn ObjectDirectory,
        issuer: &TokenIssuer,
        base_api_url: &str,
        plan: &[ProbeDescriptor],
    ) -> Result<Self> {
        let mut setup = ProbeSetup::default();

        for target in plan::targets(plan) {
            let found = directory
                .object_and_author(target.status, target.collection.name())
                .await
                .with_context(|| format!("look up {} object", target))?;
            match download_uri(base_api_url, found.as_ref()) {
                Some(uri) => {
                    setup.uris.insert(target, uri);
                }
                None => debug!(target = %target, "no object in directory, probes skipped"),
            }
        }

        for descriptor in plan {
            let privilege = descriptor.privilege;
            if setup.tokens.contains_key(&privilege) {
                continue;
            }
            if let Some(user) = privilege.requester() {
                setup.tokens.insert(privilege, issuer.issue(&user)?);
            }
        }

        Ok(setup)
    }

    pub fn with_uri(mut self, target: ProbeTarget, uri: impl Into<String>) -> Self {
        self.uris.insert(target, uri.into());
        self
    }

    pub fn with_token(mut self, privilege: Privilege, token: impl Into<String>) -> Self {
        self.tokens.insert(privilege, token.into());
        self
    }

    pub fn uri(&self, target: &ProbeTarget) -> Option<&str> {
        self.uris.get(target).map(String::as_str)
    }

    pub fn token(&self, privilege: Privilege) -> Option<&str> {
        self.tokens.get(&privilege).map(String::as_str)
    }

    pub fn resolved_targets(&self) -> usize {
        self.uris.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Passed,
    /// The directory had no object for the target.
    Skipped,
    Mismatch { observed: u16 },
    Transport { message: String },
}

impl ProbeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeOutcome::Mismatch { .. } | ProbeOutcome::Transport { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Passed => "passed",
            ProbeOutcome::Skipped => "skipped",
            ProbeOutcome::Mismatch { .. } => "mismatch",
            ProbeOutcome::Transport { .. } => "transport_error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub descriptor: ProbeDescriptor,
    pub uri: Option<String>,
    pub outcome: ProbeOutcome,
}

/// Everything one sweep observed.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub report: OutageReport,
    pub results: Vec<ProbeResult>,
    pub duration: Duration,
}

impl SweepSummary {
    fn count(&self, pred: impl Fn(&ProbeOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| *o == ProbeOutcome::Passed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == ProbeOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(ProbeOutcome::is_failure)
    }
}

/// One download request, built fresh for each probe.
struct ProbeRequest<'a> {
    uri: &'a str,
    bearer: Option<&'a str>,
}

/// Issues the probe requests of a plan, strictly one at a time.
pub struct DownloadProber {
    client: reqwest::Client,
    plan: Vec<ProbeDescriptor>,
    report_name: String,
}

impl DownloadProber {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        Self::with_plan(config, download_plan())
    }

    pub fn with_plan(config: &ProbeConfig, plan: Vec<ProbeDescriptor>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("build probe HTTP client")?;
        Ok(DownloadProber {
            client,
            plan,
            report_name: config.report_name.clone(),
        })
    }

    pub fn plan(&self) -> &[ProbeDescriptor] {
        &self.plan
    }

    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    /// Run every probe in plan order and return the accumulated report.
    pub async fn sweep(&self, setup: &ProbeSetup) -> SweepSummary {
        let started = Instant::now();
        let mut report = ReportBuilder::new(&self.report_name);
        let mut results = Vec::with_capacity(self.plan.len());

        for descriptor in &self.plan {
            let Some(uri) = setup.uri(&descriptor.target) else {
                results.push(ProbeResult {
                    descriptor: descriptor.clone(),
                    uri: None,
                    outcome: ProbeOutcome::Skipped,
                });
                continue;
            };

            let request = ProbeRequest {
                uri,
                bearer: setup.token(descriptor.privilege),
            };
            let outcome = match self.send(&request).await {
                Ok(observed) if observed == descriptor.expected_status => ProbeOutcome::Passed,
                Ok(observed) => {
                    warn!(
                        privilege = %descriptor.privilege,
                        target = %descriptor.target,
                        expected = descriptor.expected_status,
                        observed,
                        uri,
                        "unexpected download status"
                    );
                    ProbeOutcome::Mismatch { observed }
                }
                Err(e) => {
                    warn!(
                        privilege = %descriptor.privilege,
                        target = %descriptor.target,
                        error = %e,
                        uri,
                        "download request failed"
                    );
                    ProbeOutcome::Transport {
                        message: e.to_string(),
                    }
                }
            };

            if outcome.is_failure() {
                report.record_failure(
                    &descriptor.description,
                    descriptor.privilege.access_group(),
                    uri,
                    Utc::now(),
                );
            }
            results.push(ProbeResult {
                descriptor: descriptor.clone(),
                uri: Some(uri.to_string()),
                outcome,
            });
        }

        let summary = SweepSummary {
            report: report.finish(),
            results,
            duration: started.elapsed(),
        };
        info!(
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            elapsed_ms = summary.duration.as_millis() as u64,
            "download sweep finished"
        );
        summary
    }

    async fn send(&self, request: &ProbeRequest<'_>) -> Result<u16, reqwest::Error> {
        let mut builder = self
            .client
            .get(request.uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        Ok(response.status().as_u16())
    }
}
