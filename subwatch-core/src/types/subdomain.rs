//! Subdomain type definitions

use serde::{Deserialize, Serialize};

/// Status given to subdomains created without one
pub const DEFAULT_SUBDOMAIN_STATUS: &str = "unknown";

/// Status given to subdomains a scan found reachable
pub const ALIVE_SUBDOMAIN_STATUS: &str = "alive";

/// A host under a target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subdomain {
    pub id: i64,
    pub target_id: i64,
    pub url: String,
    pub title: String,
    /// Free-form liveness status (`alive`, `missing`, ...)
    pub status: String,
}

/// Create subdomain request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubdomainRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Update subdomain request (absent fields are left untouched)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubdomainRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateSubdomainRequest {
    /// Apply the present fields to an existing subdomain.
    pub fn apply_to(&self, subdomain: &mut Subdomain) {
        if let Some(ref url) = self.url {
            subdomain.url.clone_from(url);
        }
        if let Some(ref title) = self.title {
            subdomain.title.clone_from(title);
        }
        if let Some(ref status) = self.status {
            subdomain.status.clone_from(status);
        }
    }
}

/// Validated data for a new subdomain row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubdomain {
    pub url: String,
    pub title: String,
    pub status: String,
}

/// A host reported by a scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSubdomain {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DiscoveredSubdomain {
    /// Row data for a first sighting.
    #[must_use]
    pub fn to_new_subdomain(&self) -> NewSubdomain {
        NewSubdomain {
            url: self.url.clone(),
            title: self.title.clone().unwrap_or_default(),
            status: self
                .status
                .clone()
                .unwrap_or_else(|| ALIVE_SUBDOMAIN_STATUS.to_string()),
        }
    }
}
