//! # Database — PostgreSQL Storage Layer
//!
//! Async access to the outage report table and the learning-object directory
//! via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `platform_outage_reports`: name, access_groups, issues, links,
//!   discovered, resolved. A partial unique index on `name WHERE resolved IS
//!   NULL` allows at most one active report per subsystem.
//! - `learning_objects`: cuid, version, status, collection, author_id
//! - `users`: id, username
//!
//! ## Module Structure
//!
//! - [`reports`] — active report lookup, creation, partial update
//!   ([`crate::store::ReportStore`])
//! - [`objects`] — random object sampling by status/collection
//!   ([`crate::directory::ObjectDirectory`])

mod objects;
mod reports;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// Schema for the report table and the directory tables, idempotent.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/001_outage_reports.sql");

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Parses the URL manually so percent-encoded credentials are decoded
    /// before being handed to the connection options.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url).context("parse DATABASE_URL")?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .context("connect to PostgreSQL")?;
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("apply schema")?;
        Ok(())
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
