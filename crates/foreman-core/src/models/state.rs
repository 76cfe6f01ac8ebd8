//! Organization-wide state: counters, recent actions and one-time flags.

use std::collections::BTreeSet;

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{ActionKind, EntryStatus};

/// Activity counters tracked across the lifetime of the state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    pub ideas_processed: u64,
    pub repositories_created: u64,
    pub branches_opened: u64,
    pub issues_opened: u64,
    pub issues_closed: u64,
    pub prs_merged: u64,
    pub prs_open: u64,
}

/// One executed action, kept for the audit trail shown in reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    /// Date of the plan the action belonged to
    pub plan_date: Date,
    pub kind: ActionKind,
    /// Repository the action targeted
    pub target: String,
    pub status: EntryStatus,
    /// External identifier on success (URL, ref, issue number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub at: Timestamp,
}

/// Singleton record describing the organization as seen by the agent.
///
/// Only the state store writes this record; everything else receives a
/// snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrgState {
    pub counters: Counters,

    /// Most recent first, bounded by the configured limit
    #[serde(default)]
    pub recent_actions: Vec<ActionRecord>,

    /// One-time message keys already claimed
    #[serde(default)]
    pub flags: BTreeSet<String>,

    /// Last time the record was persisted; `None` for a fresh state
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl OrgState {
    /// Prepends an action, dropping the oldest ones beyond `limit`.
    pub fn push_action(&mut self, record: ActionRecord, limit: usize) {
        self.recent_actions.insert(0, record);
        self.recent_actions.truncate(limit);
    }

    /// Bumps the counter matching a successfully executed action.
    pub fn count_success(&mut self, kind: ActionKind) {
        let counter = match kind {
            ActionKind::CreateRepository => &mut self.counters.repositories_created,
            ActionKind::OpenFeatureBranch => &mut self.counters.branches_opened,
            ActionKind::FileIssue => &mut self.counters.issues_opened,
        };
        *counter += 1;
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains(key)
    }
}
