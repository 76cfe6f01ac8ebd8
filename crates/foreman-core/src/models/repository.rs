//! Repositories known to the organization.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A repository the agent created or discovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,

    /// Idea the repository was created from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub created_at: Timestamp,
}

/// An issue or pull request as listed by the source host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub is_pull_request: bool,
}
