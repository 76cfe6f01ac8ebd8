//! Idea proposals and their ranked form.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

/// An unranked project proposal, as produced by idea generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A proposal after scoring by the text-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub score: f64,
}

/// A ranked idea persisted by the store. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub score: f64,

    /// 0-based position within its batch, after ranking
    pub rank: u32,

    /// UTC date of the batch the idea was ranked in
    pub batch_date: Date,
    pub created_at: Timestamp,
}
