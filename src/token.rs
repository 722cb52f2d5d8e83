//! # Token — Bearer Credentials for Probe Requesters
//!
//! Mints the HS256 bearer tokens the probes present to the download service.
//! Claims mirror what the service's auth layer expects: identity fields,
//! verification flag and access-group memberships (some scoped to a
//! collection, e.g. `reviewer@nccp`), plus issuer, audience and a fixed
//! 24-hour lifetime.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime in seconds (24 hours).
pub const TOKEN_LIFETIME_SECS: i64 = 86_400;

/// Audience the download service validates.
pub const DEFAULT_AUDIENCE: &str = "https://clark.center";

/// Static descriptor of a user the probe impersonates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub username: String,
    pub name: String,
    pub email: String,
    pub organization: String,
    pub email_verified: bool,
    pub access_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterClaims {
    pub username: String,
    pub name: String,
    pub email: String,
    pub organization: String,
    pub email_verified: bool,
    pub access_groups: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl RequesterClaims {
    fn for_requester(user: &Requester, issuer: &str, audience: &str, iat: i64) -> Self {
        RequesterClaims {
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            organization: user.organization.clone(),
            email_verified: user.email_verified,
            access_groups: user.access_groups.clone(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        }
    }
}

/// Signs requester tokens with a shared HS256 key.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(signing_key: &str, issuer: &str, audience: &str) -> Self {
        TokenIssuer {
            key: EncodingKey::from_secret(signing_key.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Token for `user`, valid for 24 hours from now.
    pub fn issue(&self, user: &Requester) -> Result<String> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &Requester, issued_at: DateTime<Utc>) -> Result<String> {
        let claims =
            RequesterClaims::for_requester(user, &self.issuer, &self.audience, issued_at.timestamp());
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .with_context(|| format!("sign token for {}", user.username))
    }
}

/// Verify signature, issuer, audience and expiry of a requester token.
pub fn verify_token(
    token: &str,
    signing_key: &str,
    issuer: &str,
    audience: &str,
) -> Result<RequesterClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    let data = decode::<RequesterClaims>(
        token,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &validation,
    )
    .context("token verification failed")?;
    Ok(data.claims)
}
