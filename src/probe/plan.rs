//! Declarative probe table: which requester downloads which kind of object,
//! and the status code the download service is expected to answer with.

use crate::directory::ContentStatus;
use crate::token::Requester;
use crate::users;
use serde::Serialize;
use std::fmt;

/// Collection the scoped fixture roles (`reviewer@nccp`, `curator@nccp`) belong to.
pub const HOME_COLLECTION: &str = "nccp";

/// A collection none of the fixture roles are scoped to.
pub const OTHER_COLLECTION: &str = "cae_community";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Unauthenticated,
    Regular,
    Reviewer,
    Curator,
    Editor,
    Admin,
}

impl Privilege {
    pub const ALL: [Privilege; 6] = [
        Privilege::Unauthenticated,
        Privilege::Regular,
        Privilege::Reviewer,
        Privilege::Curator,
        Privilege::Editor,
        Privilege::Admin,
    ];

    /// Label recorded in `access_groups` when this privilege's probes fail.
    /// Unauthenticated and role-less requesters have none.
    pub fn access_group(&self) -> Option<&'static str> {
        match self {
            Privilege::Unauthenticated | Privilege::Regular => None,
            Privilege::Reviewer => Some("reviewer"),
            Privilege::Curator => Some("curator"),
            Privilege::Editor => Some("editor"),
            Privilege::Admin => Some("admin"),
        }
    }

    /// Fixture requester whose token carries this privilege.
    pub fn requester(&self) -> Option<Requester> {
        match self {
            Privilege::Unauthenticated => None,
            Privilege::Regular => Some(users::regular_user()),
            Privilege::Reviewer => Some(users::reviewer_user()),
            Privilege::Curator => Some(users::curator_user()),
            Privilege::Editor => Some(users::editor_user()),
            Privilege::Admin => Some(users::admin_user()),
        }
    }

    /// Reviewer and curator rights only apply inside their own collection.
    pub fn is_scoped(&self) -> bool {
        matches!(self, Privilege::Reviewer | Privilege::Curator)
    }

    fn describe(&self) -> &'static str {
        match self {
            Privilege::Unauthenticated => "an unauthorized user",
            Privilege::Regular => "a signed in user with no privileges",
            Privilege::Reviewer => "a reviewer",
            Privilege::Curator => "a curator",
            Privilege::Editor => "an editor",
            Privilege::Admin => "an admin",
        }
    }

    /// Expected download status code for `target`.
    pub fn expected_status(&self, target: &ProbeTarget) -> u16 {
        match self {
            Privilege::Unauthenticated => 401,
            _ => match target.status {
                ContentStatus::Unreleased => 403,
                ContentStatus::Released => 200,
                _ => match self {
                    Privilege::Regular => 403,
                    Privilege::Editor | Privilege::Admin => 200,
                    _ if target.collection == Collection::Home => 200,
                    _ => 403,
                },
            },
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privilege::Unauthenticated => "unauthenticated",
            Privilege::Regular => "regular",
            Privilege::Reviewer => "reviewer",
            Privilege::Curator => "curator",
            Privilege::Editor => "editor",
            Privilege::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Collection a probed object is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// No collection filter.
    Any,
    Home,
    Other,
}

impl Collection {
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Collection::Any => None,
            Collection::Home => Some(HOME_COLLECTION),
            Collection::Other => Some(OTHER_COLLECTION),
        }
    }
}

/// The kind of object a probe downloads; resolved to one URI per sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProbeTarget {
    pub status: ContentStatus,
    pub collection: Collection,
}

impl ProbeTarget {
    pub fn new(status: ContentStatus, collection: Collection) -> Self {
        ProbeTarget { status, collection }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.collection.name() {
            Some(collection) => write!(f, "{}@{}", self.status, collection),
            None => write!(f, "{}", self.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeDescriptor {
    pub privilege: Privilege,
    pub target: ProbeTarget,
    pub expected_status: u16,
    pub description: String,
}

impl ProbeDescriptor {
    pub fn new(privilege: Privilege, target: ProbeTarget) -> Self {
        let expected_status = privilege.expected_status(&target);
        let from = match target.collection.name() {
            Some(collection) => format!(" from the {} collection", collection),
            None => String::new(),
        };
        let description = format!(
            "Should return a status code of {} when downloading {} objects{} as {}",
            expected_status,
            target.status.describe(),
            from,
            privilege.describe()
        );
        ProbeDescriptor {
            privilege,
            target,
            expected_status,
            description,
        }
    }
}

/// Collections probed for a status: review-pipeline objects are probed both
/// inside and outside the scoped roles' collection.
fn collections_for(status: ContentStatus) -> &'static [Collection] {
    if status.in_review_pipeline() {
        &[Collection::Home, Collection::Other]
    } else {
        &[Collection::Any]
    }
}

/// Full sweep order: privilege, then content status, then collection.
pub fn download_plan() -> Vec<ProbeDescriptor> {
    let mut plan = Vec::new();
    for privilege in Privilege::ALL {
        for status in ContentStatus::ALL {
            for &collection in collections_for(status) {
                plan.push(ProbeDescriptor::new(
                    privilege,
                    ProbeTarget::new(status, collection),
                ));
            }
        }
    }
    plan
}

/// Distinct targets of `plan` in first-use order.
pub fn targets(plan: &[ProbeDescriptor]) -> Vec<ProbeTarget> {
    let mut seen = Vec::new();
    for descriptor in plan {
        if !seen.contains(&descriptor.target) {
            seen.push(descriptor.target);
        }
    }
    seen
}
