//! # Prometheus Metrics — Exposition for Container Orchestration
//!
//! Exposes probe operational metrics in the Prometheus text exposition format.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `outage_probe_sweeps_total` | Counter | — | Completed download sweeps |
//! | `outage_probe_probes_total` | Counter | `outcome` | Probe results by outcome |
//! | `outage_probe_probe_failures_total` | Counter | `access_group` | Failed probes by impacted group |
//! | `outage_probe_report_actions_total` | Counter | `action` | Reconciliation actions taken |
//! | `outage_probe_report_active` | Gauge | — | 1 while an outage report is open |
//! | `outage_probe_sweep_duration_seconds` | Histogram | — | Wall time of a sweep |
//! | `outage_probe_http_request_duration_seconds` | Histogram | `method`, `path` | Server request latency |
//!
//! The `/metrics` endpoint renders the current registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct OutcomeLabel {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct AccessGroupLabel {
    pub access_group: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct ActionLabel {
    pub action: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

fn http_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.005, 2.0, 14))
}

/// Thread-safe metrics registry for the probe service.
pub struct Metrics {
    pub registry: Registry,
    pub sweeps: Counter,
    pub probes: Family<OutcomeLabel, Counter>,
    pub probe_failures: Family<AccessGroupLabel, Counter>,
    pub report_actions: Family<ActionLabel, Counter>,
    pub report_active: Gauge,
    pub sweep_duration: Histogram,
    pub http_request_duration: Family<HttpLabel, Histogram, fn() -> Histogram>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let sweeps = Counter::default();
        registry.register(
            "outage_probe_sweeps",
            "Completed download sweeps",
            sweeps.clone(),
        );

        let probes = Family::<OutcomeLabel, Counter>::default();
        registry.register(
            "outage_probe_probes",
            "Probe results by outcome",
            probes.clone(),
        );

        let probe_failures = Family::<AccessGroupLabel, Counter>::default();
        registry.register(
            "outage_probe_probe_failures",
            "Failed probes by impacted access group",
            probe_failures.clone(),
        );

        let report_actions = Family::<ActionLabel, Counter>::default();
        registry.register(
            "outage_probe_report_actions",
            "Outage report reconciliation actions",
            report_actions.clone(),
        );

        let report_active = Gauge::default();
        registry.register(
            "outage_probe_report_active",
            "Whether an outage report is currently open",
            report_active.clone(),
        );

        // Sweeps are dozens of sequential round-trips: 50ms .. ~7min.
        let sweep_duration = Histogram::new(exponential_buckets(0.05, 2.0, 14));
        registry.register(
            "outage_probe_sweep_duration_seconds",
            "Wall time of a download sweep",
            sweep_duration.clone(),
        );

        let http_request_duration =
            Family::<HttpLabel, Histogram, fn() -> Histogram>::new_with_constructor(
                http_histogram,
            );
        registry.register(
            "outage_probe_http_request_duration_seconds",
            "HTTP request latency",
            http_request_duration.clone(),
        );

        Self {
            registry,
            sweeps,
            probes,
            probe_failures,
            report_actions,
            report_active,
            sweep_duration,
            http_request_duration,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
