use super::Database;
use crate::directory::{AuthoredObject, ContentObject, ContentStatus, ObjectDirectory};
use anyhow::Result;
use async_trait::async_trait;

#[derive(sqlx::FromRow)]
struct AuthoredObjectRow {
    cuid: String,
    version: i32,
    username: String,
}

impl Database {
    /// Sample one object with the given status (and collection, when set)
    /// together with its author's username. Objects whose author is missing
    /// are never returned.
    pub async fn get_object_and_author_username(
        &self,
        status: ContentStatus,
        collection: Option<&str>,
    ) -> Result<Option<AuthoredObject>> {
        let row = sqlx::query_as::<_, AuthoredObjectRow>(
            "SELECT o.cuid, o.version, u.username
             FROM learning_objects o
             JOIN users u ON u.id = o.author_id
             WHERE o.status = $1
               AND ($2::text IS NULL OR o.collection = $2)
             ORDER BY random()
             LIMIT 1",
        )
        .bind(status.as_str())
        .bind(collection)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| AuthoredObject {
            object: ContentObject {
                cuid: r.cuid,
                version: r.version,
            },
            username: r.username,
        }))
    }
}

#[async_trait]
impl ObjectDirectory for Database {
    async fn object_and_author(
        &self,
        status: ContentStatus,
        collection: Option<&str>,
    ) -> Result<Option<AuthoredObject>> {
        self.get_object_and_author_username(status, collection).await
    }
}
