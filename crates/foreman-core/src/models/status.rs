//! Status and kind enumerations for plans and their entries.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a daily plan. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Plan persisted, no entry touched yet
    #[default]
    Planned,

    /// At least one entry has been picked up by the executor
    Executing,

    /// Every entry resolved; the plan is immutable from here on
    Executed,
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(PlanStatus::Planned),
            "executing" => Ok(PlanStatus::Executing),
            "executed" => Ok(PlanStatus::Executed),
            _ => Err(format!("Invalid plan status: {s}")),
        }
    }
}

impl PlanStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Planned => "planned",
            PlanStatus::Executing => "executing",
            PlanStatus::Executed => "executed",
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_advance_to(&self, next: PlanStatus) -> bool {
        next > *self
    }
}

/// Execution status of a single plan entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting for the executor
    #[default]
    Pending,

    /// Collaborator call completed
    Succeeded,

    /// Permanent error or retries exhausted
    Failed,

    /// Deliberately not executed (dry run, precondition no longer holds)
    Skipped,
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EntryStatus::Pending),
            "succeeded" => Ok(EntryStatus::Succeeded),
            "failed" => Ok(EntryStatus::Failed),
            "skipped" => Ok(EntryStatus::Skipped),
            _ => Err(format!("Invalid entry status: {s}")),
        }
    }
}

impl EntryStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Succeeded => "succeeded",
            EntryStatus::Failed => "failed",
            EntryStatus::Skipped => "skipped",
        }
    }

    /// Every status except `Pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntryStatus::Pending)
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use foreman_core::models::EntryStatus;
    ///
    /// assert_eq!(EntryStatus::Succeeded.with_icon(), "✓ Succeeded");
    /// assert_eq!(EntryStatus::Pending.with_icon(), "○ Pending");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "○ Pending",
            EntryStatus::Succeeded => "✓ Succeeded",
            EntryStatus::Failed => "✗ Failed",
            EntryStatus::Skipped => "– Skipped",
        }
    }
}

/// The kinds of work a plan entry can describe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Create a new repository in the organization
    CreateRepository,

    /// Open a feature branch on an existing repository
    OpenFeatureBranch,

    /// File an issue on an existing repository
    FileIssue,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create-repository" => Ok(ActionKind::CreateRepository),
            "open-feature-branch" => Ok(ActionKind::OpenFeatureBranch),
            "file-issue" => Ok(ActionKind::FileIssue),
            _ => Err(format!("Invalid action kind: {s}")),
        }
    }
}

impl ActionKind {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateRepository => "create-repository",
            ActionKind::OpenFeatureBranch => "open-feature-branch",
            ActionKind::FileIssue => "file-issue",
        }
    }
}
