//! Daily plan and plan entry models.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{ActionKind, EntryStatus, PlanStatus};

/// Why an entry failed, as recorded for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryError {
    /// Short label (`transient`, `permission-denied`, ...)
    pub classification: String,
    pub message: String,
}

/// One planned unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanEntry {
    /// 0-based execution order within the plan
    pub position: u32,

    /// Idea backing the entry; `None` for maintenance work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea_id: Option<u64>,

    pub kind: ActionKind,

    /// Repository the action is realised against
    pub target: String,

    /// Human-readable description of the work
    pub instruction: String,

    pub status: EntryStatus,

    /// External identifier recorded on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Recorded on failure, or the reason for a skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,

    /// Collaborator attempts made for this entry
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
}

impl PlanEntry {
    /// Creates a pending entry.
    pub fn pending(
        position: u32,
        idea_id: Option<u64>,
        kind: ActionKind,
        target: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            position,
            idea_id,
            kind,
            target: target.into(),
            instruction: instruction.into(),
            status: EntryStatus::Pending,
            reference: None,
            error: None,
            attempts: 0,
            resolved_at: None,
        }
    }

    pub fn is_maintenance(&self) -> bool {
        self.idea_id.is_none()
    }
}

/// The plan for a single UTC calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPlan {
    /// Date key; at most one plan per date
    pub date: Date,
    pub status: PlanStatus,
    pub entries: Vec<PlanEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Per-status tally of a plan's entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryTally {
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl DailyPlan {
    pub fn is_executed(&self) -> bool {
        self.status == PlanStatus::Executed
    }

    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.status == EntryStatus::Pending)
    }

    pub fn tally(&self) -> EntryTally {
        self.entries
            .iter()
            .fold(EntryTally::default(), |mut tally, entry| {
                match entry.status {
                    EntryStatus::Pending => tally.pending += 1,
                    EntryStatus::Succeeded => tally.succeeded += 1,
                    EntryStatus::Failed => tally.failed += 1,
                    EntryStatus::Skipped => tally.skipped += 1,
                }
                tally
            })
    }
}
