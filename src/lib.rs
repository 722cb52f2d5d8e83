pub mod checker;
pub mod db;
pub mod directory;
pub mod probe;
pub mod prom_metrics;
pub mod report;
pub mod server;
pub mod store;
pub mod token;
pub mod users;

pub use checker::{CheckRun, DownloadChecker};
pub use report::{OutageReport, OutageReportUpdates, Reconciliation};
