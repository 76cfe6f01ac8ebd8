//! Daily plan operations.

use std::time::Duration;

use jiff::civil::Date;

use super::StateStore;
use crate::{
    db::plan_queries::EntryResolution,
    error::Result,
    models::{DailyPlan, PlanStatus},
};

impl StateStore {
    pub async fn get_plan(&self, date: Date) -> Result<Option<DailyPlan>> {
        self.with_database(move |db| db.get_plan(date)).await
    }

    /// Most recent plans first.
    pub async fn list_plans(&self, limit: u32) -> Result<Vec<DailyPlan>> {
        self.with_database(move |db| db.list_plans(limit)).await
    }

    /// Persists `plan` unless one exists for the date; returns whichever plan
    /// is stored afterwards.
    pub async fn insert_plan_if_absent(&self, plan: &DailyPlan) -> Result<DailyPlan> {
        let plan = plan.clone();
        self.with_database(move |db| db.insert_plan_if_absent(&plan))
            .await
    }

    /// Advances the plan status. Returns the stored status, which is left
    /// unchanged when `next` would move backwards.
    pub async fn set_plan_status(&self, date: Date, next: PlanStatus) -> Result<PlanStatus> {
        self.with_database(move |db| db.advance_plan_status(date, next))
            .await
    }

    /// Records an entry outcome together with its counter and audit-trail
    /// effects. Returns `false` if the entry had already been resolved.
    pub async fn resolve_entry(
        &self,
        date: Date,
        resolution: EntryResolution,
        recent_limit: usize,
    ) -> Result<bool> {
        self.with_database(move |db| db.resolve_entry(date, &resolution, recent_limit))
            .await
    }

    /// Claims a pending entry for `owner`. Returns `false` when the entry is
    /// resolved or held by another live claim.
    pub async fn claim_entry(
        &self,
        date: Date,
        position: u32,
        owner: &str,
        lease: Duration,
    ) -> Result<bool> {
        let owner = owner.to_string();
        self.with_database(move |db| db.claim_entry(date, position, &owner, lease))
            .await
    }

    pub async fn release_entry(&self, date: Date, position: u32, owner: &str) -> Result<()> {
        let owner = owner.to_string();
        self.with_database(move |db| db.release_entry(date, position, &owner))
            .await
    }
}
