//! # Directory — Learning Object Lookup and Download URIs
//!
//! The [`ObjectDirectory`] trait samples one learning object matching a
//! content status (optionally restricted to a collection) together with its
//! author's username. [`download_uri`] turns that pair into the bundle URL
//! the probes request. A directory miss is not an error: it yields no URI,
//! and the dependent probe is skipped.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a learning object, as stored in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Unreleased,
    Released,
    Waiting,
    Review,
    Proofing,
}

impl ContentStatus {
    pub const ALL: [ContentStatus; 5] = [
        ContentStatus::Unreleased,
        ContentStatus::Released,
        ContentStatus::Waiting,
        ContentStatus::Review,
        ContentStatus::Proofing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Unreleased => "unreleased",
            ContentStatus::Released => "released",
            ContentStatus::Waiting => "waiting",
            ContentStatus::Review => "review",
            ContentStatus::Proofing => "proofing",
        }
    }

    /// Phrase used in human-readable issue descriptions.
    pub fn describe(&self) -> &'static str {
        match self {
            ContentStatus::Review => "in review",
            other => other.as_str(),
        }
    }

    /// Waiting, review and proofing objects belong to a collection's review
    /// pipeline and are only visible to that collection's reviewers.
    pub fn in_review_pipeline(&self) -> bool {
        matches!(
            self,
            ContentStatus::Waiting | ContentStatus::Review | ContentStatus::Proofing
        )
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentObject {
    pub cuid: String,
    pub version: i32,
}

/// A sampled object and the username of its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredObject {
    pub object: ContentObject,
    pub username: String,
}

#[async_trait]
pub trait ObjectDirectory: Send + Sync {
    /// Sample one object with `status` (and `collection`, when given).
    async fn object_and_author(
        &self,
        status: ContentStatus,
        collection: Option<&str>,
    ) -> Result<Option<AuthoredObject>>;
}

/// `{base}/users/{username}/learning-objects/{cuid}/versions/{version}/bundle`,
/// or `None` when the directory had no matching object.
pub fn download_uri(base_api_url: &str, found: Option<&AuthoredObject>) -> Option<String> {
    let found = found?;
    Some(format!(
        "{}/users/{}/learning-objects/{}/versions/{}/bundle",
        base_api_url.trim_end_matches('/'),
        urlencoding::encode(&found.username),
        urlencoding::encode(&found.object.cuid),
        found.object.version
    ))
}
