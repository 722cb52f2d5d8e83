//! # Report — Outage Report Model and Reconciliation
//!
//! An [`OutageReport`] describes one incident for a named subsystem (e.g.
//! `downloads`). A sweep builds a fresh report through [`ReportBuilder`], and
//! [`plan_reconciliation`] decides how that observation should be folded into
//! the store's currently active report.
//!
//! ## Reconciliation Table
//!
//! | Active report | Observed issues | Collections equal | Action |
//! |---------------|-----------------|-------------------|--------|
//! | none | ≥ 1 | — | `Create` |
//! | some | ≥ 1 | no | `Update` (groups, issues, links) |
//! | some | ≥ 1 | yes | `Unchanged` |
//! | some | 0 | — | `Resolve` |
//! | none | 0 | — | `Nothing` |
//!
//! "Collections equal" is an element-wise comparison of `access_groups`,
//! `issues` and `links`. An active report whose own issue list is empty is
//! still resolvable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subsystem name used for download outage reports.
pub const DOWNLOADS_REPORT: &str = "downloads";

/// One open or resolved incident for a named subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutageReport {
    pub name: String,
    pub access_groups: Vec<String>,
    pub issues: Vec<String>,
    pub discovered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<DateTime<Utc>>,
}

impl OutageReport {
    /// An empty, undiscovered report.
    pub fn new(name: &str) -> Self {
        OutageReport {
            name: name.to_string(),
            access_groups: Vec::new(),
            issues: Vec::new(),
            discovered: None,
            links: Vec::new(),
            resolved: None,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Element-wise comparison of the finding collections.
    pub fn same_findings(&self, other: &OutageReport) -> bool {
        self.access_groups == other.access_groups
            && self.issues == other.issues
            && self.links == other.links
    }
}

/// Partial update applied to the active report. Unset fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutageReportUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<DateTime<Utc>>,
}

impl OutageReportUpdates {
    /// Carries the findings of `report`; `links` only when it has any.
    pub fn findings_of(report: &OutageReport) -> Self {
        OutageReportUpdates {
            access_groups: Some(report.access_groups.clone()),
            issues: Some(report.issues.clone()),
            links: (!report.links.is_empty()).then(|| report.links.clone()),
            resolved: None,
        }
    }

    pub fn resolved_at(at: DateTime<Utc>) -> Self {
        OutageReportUpdates {
            resolved: Some(at),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_groups.is_none()
            && self.issues.is_none()
            && self.links.is_none()
            && self.resolved.is_none()
    }
}

/// Accumulates failures during a sweep with first-seen ordering and
/// duplicate suppression on every collection.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report: OutageReport,
    failures: usize,
}

impl ReportBuilder {
    pub fn new(name: &str) -> Self {
        ReportBuilder {
            report: OutageReport::new(name),
            failures: 0,
        }
    }

    /// Record one failing check. `discovered` is only set by the first call.
    pub fn record_failure(
        &mut self,
        issue: &str,
        access_group: Option<&str>,
        link: &str,
        at: DateTime<Utc>,
    ) {
        self.failures += 1;
        if !issue.is_empty() {
            push_unique(&mut self.report.issues, issue);
        }
        if let Some(group) = access_group.filter(|g| !g.is_empty()) {
            push_unique(&mut self.report.access_groups, group);
        }
        if !link.is_empty() {
            push_unique(&mut self.report.links, link);
        }
        if self.report.discovered.is_none() {
            self.report.discovered = Some(at);
        }
    }

    /// Number of `record_failure` calls, duplicates included.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn finish(self) -> OutageReport {
        self.report
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

/// The single store write (if any) that brings the active report in line
/// with a sweep's observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No active report and nothing failed.
    Nothing,
    /// Active report already describes exactly what was observed.
    Unchanged,
    Create(OutageReport),
    Update(OutageReportUpdates),
    Resolve(OutageReportUpdates),
}

impl Reconciliation {
    pub fn action(&self) -> &'static str {
        match self {
            Reconciliation::Nothing => "none",
            Reconciliation::Unchanged => "unchanged",
            Reconciliation::Create(_) => "create",
            Reconciliation::Update(_) => "update",
            Reconciliation::Resolve(_) => "resolve",
        }
    }

    pub fn writes(&self) -> bool {
        matches!(
            self,
            Reconciliation::Create(_) | Reconciliation::Update(_) | Reconciliation::Resolve(_)
        )
    }
}

/// Decide how `observed` should be reconciled against the `active` report.
pub fn plan_reconciliation(
    active: Option<&OutageReport>,
    observed: &OutageReport,
    now: DateTime<Utc>,
) -> Reconciliation {
    match (active, observed.has_issues()) {
        (None, false) => Reconciliation::Nothing,
        (None, true) => Reconciliation::Create(observed.clone()),
        (Some(_), false) => Reconciliation::Resolve(OutageReportUpdates::resolved_at(now)),
        (Some(current), true) if current.same_findings(observed) => Reconciliation::Unchanged,
        (Some(_), true) => Reconciliation::Update(OutageReportUpdates::findings_of(observed)),
    }
}
