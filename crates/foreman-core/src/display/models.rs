//! Display implementations for domain models.
//!
//! Everything renders as markdown so the CLI can hand it to the terminal
//! renderer and the MCP server can return it verbatim.

use std::fmt;

use super::datetime::{LocalDateTime, MaybeDateTime};
use crate::models::{
    ActionKind, ActionRecord, Counters, DailyPlan, EntryStatus, Idea, OrgState, PlanEntry,
    PlanStatus, Repository,
};

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}. **{}** `{}` ({})",
            self.position + 1,
            self.kind,
            self.target,
            self.status.with_icon()
        )?;
        writeln!(f, "   - {}", self.instruction)?;

        if let Some(reference) = &self.reference {
            writeln!(f, "   - Reference: {reference}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "   - Error ({}): {}", error.classification, error.message)?;
        }
        if self.attempts > 0 {
            writeln!(f, "   - Attempts: {}", self.attempts)?;
        }
        Ok(())
    }
}

impl fmt::Display for DailyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Plan for {}", self.date)?;
        writeln!(f)?;
        writeln!(f, "- Status: {}", self.status)?;

        let tally = self.tally();
        writeln!(
            f,
            "- Entries: {} succeeded, {} failed, {} skipped, {} pending",
            tally.succeeded, tally.failed, tally.skipped, tally.pending
        )?;
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;
        writeln!(f)?;

        if self.entries.is_empty() {
            writeln!(f, "No entries in this plan.")?;
        }
        for entry in &self.entries {
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| Counter | Value |")?;
        writeln!(f, "|---|---|")?;
        writeln!(f, "| Ideas processed | {} |", self.ideas_processed)?;
        writeln!(f, "| Repositories created | {} |", self.repositories_created)?;
        writeln!(f, "| Branches opened | {} |", self.branches_opened)?;
        writeln!(f, "| Issues opened | {} |", self.issues_opened)?;
        writeln!(f, "| Issues closed | {} |", self.issues_closed)?;
        writeln!(f, "| PRs merged | {} |", self.prs_merged)?;
        writeln!(f, "| PRs open | {} |", self.prs_open)
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {} {} `{}` ({})",
            LocalDateTime(&self.at),
            self.kind,
            self.target,
            self.status
        )?;
        if let Some(reference) = &self.reference {
            write!(f, " → {reference}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for OrgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Counters")?;
        writeln!(f)?;
        write!(f, "{}", self.counters)?;
        writeln!(f)?;

        writeln!(f, "## Recent actions")?;
        writeln!(f)?;
        if self.recent_actions.is_empty() {
            writeln!(f, "No actions recorded yet.")?;
        }
        for record in &self.recent_actions {
            write!(f, "{record}")?;
        }
        writeln!(f)?;
        writeln!(f, "- Last updated: {}", MaybeDateTime(self.updated_at.as_ref()))
    }
}

impl fmt::Display for Idea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## {}. {} (ID: {}, score {:.2})",
            self.rank + 1,
            self.title,
            self.id,
            self.score
        )?;
        if !self.description.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.description)?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- **{}**", self.name)?;
        if let Some(url) = &self.url {
            write!(f, " <{url}>")?;
        }
        if let Some(idea_id) = self.idea_id {
            write!(f, " (idea {idea_id})")?;
        }
        writeln!(f)
    }
}
