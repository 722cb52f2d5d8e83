//! # Mock Download Service — In-Process Bundle Endpoint for Tests
//!
//! A lightweight axum server that serves
//! `GET /users/{username}/learning-objects/{cuid}/versions/{version}/bundle`
//! and enforces the same authorization rules as the real download service:
//!
//! | Requester | unreleased | released | review pipeline, own collection | review pipeline, other |
//! |-----------|------------|----------|---------------------------------|------------------------|
//! | no/invalid token | 401 | 401 | 401 | 401 |
//! | no role | 403 | 200 | 403 | 403 |
//! | `reviewer@c` / `curator@c` | 403 | 200 | 200 | 403 |
//! | `editor` / `admin` | 403 | 200 | 200 | 200 |
//!
//! Individual objects can be broken on purpose (fixed status code or an
//! artificial delay) to exercise the probe's failure paths. Every request is
//! recorded for later inspection.
//!
//! ```text
//! MockDownloadService::start()
//!   └─ TcpListener::bind("127.0.0.1:0")   (random port)
//!   └─ axum::serve(listener, router)       (background tokio task)
//!   └─ SharedState (Arc<Mutex<MockState>>) (catalog + behaviors + request log)
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use outage_probe::directory::{AuthoredObject, ContentObject, ContentStatus, ObjectDirectory};
use outage_probe::probe::{HOME_COLLECTION, OTHER_COLLECTION};
use outage_probe::token::{verify_token, TokenIssuer, DEFAULT_AUDIENCE};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const SIGNING_KEY: &str = "mock-download-service-signing-key";
pub const ISSUER: &str = "mock-download-service";

/// Token issuer whose tokens the mock accepts.
pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(SIGNING_KEY, ISSUER, DEFAULT_AUDIENCE)
}

// ── Catalog ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CatalogObject {
    pub cuid: String,
    pub version: i32,
    pub status: ContentStatus,
    pub collection: String,
    pub author: String,
}

impl CatalogObject {
    pub fn new(cuid: &str, status: ContentStatus, collection: &str) -> Self {
        CatalogObject {
            cuid: cuid.to_string(),
            version: 1,
            status,
            collection: collection.to_string(),
            author: "nvalentine".to_string(),
        }
    }
}

/// One object per probe target.
pub fn standard_catalog() -> Vec<CatalogObject> {
    vec![
        CatalogObject::new("unreleased-1", ContentStatus::Unreleased, HOME_COLLECTION),
        CatalogObject::new("released-1", ContentStatus::Released, HOME_COLLECTION),
        CatalogObject::new("waiting-home", ContentStatus::Waiting, HOME_COLLECTION),
        CatalogObject::new("waiting-other", ContentStatus::Waiting, OTHER_COLLECTION),
        CatalogObject::new("review-home", ContentStatus::Review, HOME_COLLECTION),
        CatalogObject::new("review-other", ContentStatus::Review, OTHER_COLLECTION),
        CatalogObject::new("proofing-home", ContentStatus::Proofing, HOME_COLLECTION),
        CatalogObject::new("proofing-other", ContentStatus::Proofing, OTHER_COLLECTION),
    ]
}

/// Directory backed by a fixed catalog; returns the first match.
#[derive(Debug, Clone)]
pub struct CatalogDirectory {
    objects: Vec<CatalogObject>,
}

impl CatalogDirectory {
    pub fn new(objects: Vec<CatalogObject>) -> Self {
        CatalogDirectory { objects }
    }
}

#[async_trait]
impl ObjectDirectory for CatalogDirectory {
    async fn object_and_author(
        &self,
        status: ContentStatus,
        collection: Option<&str>,
    ) -> anyhow::Result<Option<AuthoredObject>> {
        Ok(self
            .objects
            .iter()
            .find(|o| o.status == status && collection.map_or(true, |c| o.collection == c))
            .map(|o| AuthoredObject {
                object: ContentObject {
                    cuid: o.cuid.clone(),
                    version: o.version,
                },
                username: o.author.clone(),
            }))
    }
}

// ── Behaviors and request log ───────────────────────────────────────

/// What the mock does when a given object is requested.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Apply the authorization rules.
    Normal,
    /// Always answer with this status code.
    Status(u16),
    /// Sleep before applying the authorization rules.
    Delay(Duration),
}

#[derive(Debug, Clone)]
pub struct RecordedDownload {
    pub username: String,
    pub cuid: String,
    pub version: i32,
    pub bearer: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    objects: Vec<CatalogObject>,
    behaviors: HashMap<String, MockBehavior>,
    requests: Vec<RecordedDownload>,
}

type SharedState = Arc<Mutex<MockState>>;

// ── MockDownloadService ─────────────────────────────────────────────

pub struct MockDownloadService {
    base_url: String,
    _abort_handle: tokio::task::AbortHandle,
    state: SharedState,
}

impl MockDownloadService {
    /// Start with the standard catalog and no broken objects.
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockDownloadServiceBuilder {
        MockDownloadServiceBuilder {
            state: MockState {
                objects: standard_catalog(),
                ..Default::default()
            },
        }
    }

    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    /// Directory over this service's catalog.
    pub fn directory(&self) -> CatalogDirectory {
        CatalogDirectory::new(self.state.lock().unwrap().objects.clone())
    }

    pub fn requests(&self) -> Vec<RecordedDownload> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn set_behavior(&self, cuid: &str, behavior: MockBehavior) {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert(cuid.to_string(), behavior);
    }

    pub fn heal(&self) {
        self.state.lock().unwrap().behaviors.clear();
    }
}

pub struct MockDownloadServiceBuilder {
    state: MockState,
}

impl MockDownloadServiceBuilder {
    /// Drop every catalog object with `status`.
    pub fn without_status(mut self, status: ContentStatus) -> Self {
        self.state.objects.retain(|o| o.status != status);
        self
    }

    pub fn with_behavior(mut self, cuid: &str, behavior: MockBehavior) -> Self {
        self.state.behaviors.insert(cuid.to_string(), behavior);
        self
    }

    pub async fn start(self) -> MockDownloadService {
        let shared_state: SharedState = Arc::new(Mutex::new(self.state));

        let app = Router::new()
            .route(
                "/users/{username}/learning-objects/{cuid}/versions/{version}/bundle",
                get(handle_bundle),
            )
            .with_state(Arc::clone(&shared_state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock download service to random port");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Failed to get mock download service local address");
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock download service failed");
        });

        MockDownloadService {
            base_url,
            _abort_handle: handle.abort_handle(),
            state: shared_state,
        }
    }
}

// ── Route handler ───────────────────────────────────────────────────

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn handle_bundle(
    State(state): State<SharedState>,
    Path((username, cuid, version)): Path<(String, String, i32)>,
    headers: HeaderMap,
) -> StatusCode {
    let bearer = bearer_token(&headers);
    let (object, behavior) = {
        let mut s = state.lock().unwrap();
        s.requests.push(RecordedDownload {
            username,
            cuid: cuid.clone(),
            version,
            bearer: bearer.clone(),
        });
        let object = s.objects.iter().find(|o| o.cuid == cuid).cloned();
        let behavior = s
            .behaviors
            .get(&cuid)
            .cloned()
            .unwrap_or(MockBehavior::Normal);
        (object, behavior)
    };

    match behavior {
        MockBehavior::Status(code) => {
            return StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        MockBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        MockBehavior::Normal => {}
    }

    let claims = match bearer
        .as_deref()
        .map(|t| verify_token(t, SIGNING_KEY, ISSUER, DEFAULT_AUDIENCE))
    {
        Some(Ok(claims)) => claims,
        _ => return StatusCode::UNAUTHORIZED,
    };
    let Some(object) = object else {
        return StatusCode::NOT_FOUND;
    };

    let allowed = match object.status {
        ContentStatus::Released => true,
        ContentStatus::Unreleased => false,
        _ => claims.access_groups.iter().any(|group| {
            group == "admin"
                || group == "editor"
                || *group == format!("reviewer@{}", object.collection)
                || *group == format!("curator@{}", object.collection)
        }),
    };
    if allowed {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}
