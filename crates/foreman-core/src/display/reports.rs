//! Display implementations for operation outcomes: the daily digest, report
//! delivery, maintenance and status snapshots.

use std::fmt;

use super::{
    collections::{Ideas, Repositories},
    datetime::LocalDateTime,
};
use crate::{
    agent::{CycleSummary, MaintenanceReport, StatusSnapshot},
    reporter::{Digest, ReportOutcome, ReportStatus},
};

/// Number of recent actions listed in a digest.
const DIGEST_RECENT_ACTIONS: usize = 10;

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.subject())?;
        writeln!(f)?;
        if let Some(org) = &self.organization {
            writeln!(f, "- Organization: {org}")?;
        }
        writeln!(f, "- Generated: {}", LocalDateTime(&self.generated_at))?;
        writeln!(f)?;

        writeln!(f, "## Counters")?;
        writeln!(f)?;
        write!(f, "{}", self.state.counters)?;
        writeln!(f)?;

        writeln!(f, "## Today's plan")?;
        writeln!(f)?;
        match &self.plan {
            Some(plan) => {
                writeln!(f, "Status: {}", plan.status)?;
                writeln!(f)?;
                for entry in &plan.entries {
                    write!(f, "{entry}")?;
                }
            }
            None => writeln!(f, "No plan was built for {}.", self.date)?,
        }
        writeln!(f)?;

        writeln!(f, "## Recent actions")?;
        writeln!(f)?;
        if self.state.recent_actions.is_empty() {
            writeln!(f, "No actions recorded yet.")?;
        }
        for record in self.state.recent_actions.iter().take(DIGEST_RECENT_ACTIONS) {
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReportStatus::Sent => "sent",
            ReportStatus::AlreadySent => "already sent",
            ReportStatus::NoChannels => "no notification channel configured",
        };
        write!(f, "{text}")
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Report for {}: {}", self.date, self.status)?;
        if !self.deliveries.is_empty() {
            writeln!(f)?;
        }
        for delivery in &self.deliveries {
            match &delivery.error {
                None => writeln!(f, "- ✓ {}", delivery.channel)?,
                Some(error) => writeln!(f, "- ✗ {}: {error}", delivery.channel)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Maintenance")?;
        writeln!(f)?;
        writeln!(f, "- Repositories: {}", self.repositories)?;
        writeln!(f, "- Stale issues closed: {}", self.issues_closed)?;
        writeln!(f, "- Open pull requests: {}", self.prs_open)?;
        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Failures")?;
            writeln!(f)?;
            for failure in &self.failures {
                writeln!(f, "- {failure}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Status on {}", self.date)?;
        writeln!(f)?;
        write!(f, "{}", self.state)?;
        writeln!(f)?;

        match &self.plan {
            Some(plan) => write!(f, "{plan}")?,
            None => writeln!(f, "No plan for {}.", self.date)?,
        }
        writeln!(f)?;

        writeln!(f, "## Repositories")?;
        writeln!(f)?;
        write!(f, "{}", Repositories(self.repositories.clone()))?;
        writeln!(f)?;
        write!(f, "{}", Ideas(self.ideas.clone()))
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Daily cycle")?;
        writeln!(f)?;
        if let Some(count) = self.ideas {
            writeln!(f, "- Ideas: {count}")?;
        }
        if let Some(plan) = &self.plan {
            let tally = plan.tally();
            writeln!(
                f,
                "- Plan {}: {} ({} succeeded, {} failed, {} skipped)",
                plan.date, plan.status, tally.succeeded, tally.failed, tally.skipped
            )?;
        }
        if let Some(maintenance) = &self.maintenance {
            writeln!(
                f,
                "- Maintenance: {} issue(s) closed, {} open PR(s)",
                maintenance.issues_closed, maintenance.prs_open
            )?;
        }
        if let Some(report) = &self.report {
            writeln!(f, "- Report: {}", report.status)?;
        }
        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Errors")?;
            writeln!(f)?;
            for error in &self.errors {
                writeln!(f, "- {error}")?;
            }
        }
        Ok(())
    }
}
