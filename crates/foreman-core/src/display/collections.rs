//! Newtype wrappers that render lists of models.

use std::fmt;

use crate::models::{DailyPlan, Idea, Repository};

/// Ranked ideas of one batch, best first.
pub struct Ideas(pub Vec<Idea>);

impl fmt::Display for Ideas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else {
            return writeln!(f, "No ideas found.");
        };
        writeln!(f, "# Ideas for {}", first.batch_date)?;
        writeln!(f)?;
        for idea in &self.0 {
            write!(f, "{idea}")?;
        }
        Ok(())
    }
}

/// One line per plan, newest first.
pub struct PlanSummaries(pub Vec<DailyPlan>);

impl fmt::Display for PlanSummaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No plans found.");
        }
        for plan in &self.0 {
            let tally = plan.tally();
            writeln!(
                f,
                "- **{}** {} ({}/{} succeeded)",
                plan.date,
                plan.status,
                tally.succeeded,
                plan.entries.len()
            )?;
        }
        Ok(())
    }
}

pub struct Repositories(pub Vec<Repository>);

impl fmt::Display for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No repositories known.");
        }
        for repo in &self.0 {
            write!(f, "{repo}")?;
        }
        Ok(())
    }
}
