//! Daily planner: turns ranked ideas and the known repositories into a plan
//! of exactly N entries for one UTC day.
//!
//! Planning is idempotent per date. The first successful call persists the
//! plan; every later call for the same date returns the stored plan
//! unchanged, whatever the ideas or repositories look like by then.
//!
//! # Selection
//!
//! 1. Ideas of the latest batch, best score first (ties keep rank order).
//! 2. Each idea yields `create-repository` when it has no repository yet,
//!    otherwise `open-feature-branch` on it. Colliding candidates are dropped.
//! 3. Remaining slots go to the [`MaintenancePolicy`].
//!
//! If the plan cannot reach N entries nothing is persisted and
//! [`ForemanError::Planning`] is returned.

use std::sync::Arc;

use jiff::{civil::Date, Timestamp};

use crate::{
    catalog::{self, ActionCandidate},
    error::{ForemanError, Result},
    models::{DailyPlan, Idea, PlanStatus, Repository},
    store::StateStore,
};

pub mod maintenance;

#[cfg(test)]
mod tests;

pub use maintenance::{MaintenancePolicy, RoundRobinTriage};

/// Builds and persists daily plans.
pub struct DailyPlanner {
    store: StateStore,
    actions_per_day: usize,
    policy: Arc<dyn MaintenancePolicy>,
}

impl DailyPlanner {
    pub fn new(store: StateStore, actions_per_day: usize) -> Self {
        Self {
            store,
            actions_per_day,
            policy: Arc::new(RoundRobinTriage),
        }
    }

    /// Replaces the default round-robin maintenance policy.
    pub fn with_policy(mut self, policy: Arc<dyn MaintenancePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the plan for `date`, building and persisting it first if
    /// none exists.
    pub async fn plan_for(&self, date: Date) -> Result<DailyPlan> {
        if let Some(existing) = self.store.get_plan(date).await? {
            log::debug!("Plan for {date} already exists ({})", existing.status);
            return Ok(existing);
        }

        let ideas = self.store.latest_ideas().await?;
        let repositories = self.store.list_repositories().await?;
        let plan = self.build(date, ideas, &repositories)?;

        let stored = self.store.insert_plan_if_absent(&plan).await?;
        log::info!(
            "Planned {} action(s) for {date}: {}",
            stored.entries.len(),
            stored
                .entries
                .iter()
                .map(|e| format!("{} {}", e.kind.as_str(), e.target))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(stored)
    }

    /// Assembles the plan in memory without persisting it.
    pub fn build(
        &self,
        date: Date,
        mut ideas: Vec<Idea>,
        repositories: &[Repository],
    ) -> Result<DailyPlan> {
        let wanted = self.actions_per_day;
        if wanted == 0 {
            return Err(ForemanError::Planning {
                date,
                reason: "the daily action count is zero".to_string(),
            });
        }

        // Stable: equal scores keep their rank order.
        ideas.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut selected: Vec<ActionCandidate> = Vec::with_capacity(wanted);
        for idea in &ideas {
            if selected.len() == wanted {
                break;
            }
            let candidate = match catalog::candidate_for_idea(idea, repositories, date) {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::warn!("Skipping idea {} ({}): {e}", idea.id, idea.title);
                    continue;
                }
            };
            if selected.iter().any(|c| c.conflicts_with(&candidate)) {
                log::debug!(
                    "Skipping idea {}: {} {} already planned",
                    idea.id,
                    candidate.kind.as_str(),
                    candidate.target
                );
                continue;
            }
            selected.push(candidate);
        }

        let missing = wanted - selected.len();
        if missing > 0 {
            let padding = self.policy.select(date, repositories, missing);
            if padding.len() < missing {
                return Err(ForemanError::Planning {
                    date,
                    reason: format!(
                        "{} idea-backed action(s) and {} maintenance action(s) cannot fill {wanted} slot(s)",
                        selected.len(),
                        padding.len()
                    ),
                });
            }
            selected.extend(padding.into_iter().take(missing));
        }

        let entries = selected
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| candidate.into_entry(position as u32))
            .collect::<Vec<_>>();

        for entry in &entries {
            catalog::validate_entry(entry, repositories).map_err(|e| ForemanError::Planning {
                date,
                reason: format!("entry {} is invalid: {e}", entry.position),
            })?;
        }

        let now = Timestamp::now();
        Ok(DailyPlan {
            date,
            status: PlanStatus::Planned,
            entries,
            created_at: now,
            updated_at: now,
        })
    }
}
