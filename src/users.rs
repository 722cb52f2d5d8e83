//! Fixture requesters, one per authenticated privilege level.

use crate::token::Requester;

const ORGANIZATION: &str = "towson university";

fn requester(username: &str, name: &str, access_groups: &[&str]) -> Requester {
    Requester {
        username: username.to_string(),
        name: name.to_string(),
        email: format!("{}@clark.center", username),
        organization: ORGANIZATION.to_string(),
        email_verified: false,
        access_groups: access_groups.iter().map(|g| g.to_string()).collect(),
    }
}

/// Signed in, no access groups.
pub fn regular_user() -> Requester {
    requester("ccan", "clark can", &[])
}

pub fn reviewer_user() -> Requester {
    requester("cedison", "clark edison", &["reviewer@nccp"])
}

pub fn curator_user() -> Requester {
    requester("cgreen", "clark green", &["curator@nccp"])
}

pub fn editor_user() -> Requester {
    requester("ckent", "clark kent", &["editor"])
}

pub fn admin_user() -> Requester {
    requester("cgriswold", "clark griswold", &["admin"])
}
