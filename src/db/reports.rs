use super::Database;
use crate::report::{OutageReport, OutageReportUpdates};
use crate::store::ReportStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

#[derive(sqlx::FromRow)]
struct OutageReportRow {
    name: String,
    access_groups: Vec<String>,
    issues: Vec<String>,
    links: Vec<String>,
    discovered: Option<DateTime<Utc>>,
    resolved: Option<DateTime<Utc>>,
}

impl From<OutageReportRow> for OutageReport {
    fn from(row: OutageReportRow) -> Self {
        OutageReport {
            name: row.name,
            access_groups: row.access_groups,
            issues: row.issues,
            discovered: row.discovered,
            links: row.links,
            resolved: row.resolved,
        }
    }
}

impl Database {
    pub async fn get_active_report(&self, name: &str) -> Result<Option<OutageReport>> {
        let row = sqlx::query_as::<_, OutageReportRow>(
            "SELECT name, access_groups, issues, links, discovered, resolved
             FROM platform_outage_reports
             WHERE name = $1 AND resolved IS NULL
             LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OutageReport::from))
    }

    pub async fn create_report(&self, report: &OutageReport) -> Result<()> {
        sqlx::query(
            "INSERT INTO platform_outage_reports
               (name, access_groups, issues, links, discovered, resolved)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&report.name)
        .bind(&report.access_groups)
        .bind(&report.issues)
        .bind(&report.links)
        .bind(report.discovered)
        .bind(report.resolved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply `updates` to the active report for `name`; unset fields keep
    /// their stored value.
    pub async fn update_active_report(
        &self,
        updates: &OutageReportUpdates,
        name: &str,
    ) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let result = sqlx::query(
            "UPDATE platform_outage_reports SET
               access_groups = COALESCE($2::text[], access_groups),
               issues = COALESCE($3::text[], issues),
               links = COALESCE($4::text[], links),
               resolved = COALESCE($5::timestamptz, resolved)
             WHERE name = $1 AND resolved IS NULL",
        )
        .bind(name)
        .bind(&updates.access_groups)
        .bind(&updates.issues)
        .bind(&updates.links)
        .bind(updates.resolved)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            warn!(report = name, "no active outage report to update");
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for Database {
    async fn get_active_report(&self, name: &str) -> Result<Option<OutageReport>> {
        Database::get_active_report(self, name).await
    }

    async fn create_report(&self, report: &OutageReport) -> Result<()> {
        Database::create_report(self, report).await
    }

    async fn update_active_report(
        &self,
        updates: &OutageReportUpdates,
        name: &str,
    ) -> Result<()> {
        Database::update_active_report(self, updates, name).await
    }

    async fn health_check(&self) -> Result<()> {
        Database::health_check(self).await
    }
}
