//! Plan executor: runs the pending entries of a persisted plan against the
//! source host and records each outcome.
//!
//! Entries are resolved one at a time and each resolution is committed
//! before the next entry starts, so an interrupted pass resumes at the first
//! entry still `pending`. Resolved entries are never executed again.
//!
//! Before its collaborator call an entry is claimed in the store under a
//! lease, so executors in other processes sharing the database skip it. A
//! claim outlives its owner only until the lease expires.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use jiff::civil::Date;
use tokio::sync::watch;

use crate::{
    catalog,
    collaborators::{with_timeout, CollabResult, SourceHost},
    config::Config,
    db::plan_queries::EntryResolution,
    error::{CollaboratorError, ForemanError, PermanentKind, Result},
    models::{ActionKind, DailyPlan, EntryError, EntryStatus, PlanEntry, PlanStatus},
    retry::{RetryOutcome, RetryPolicy},
    store::StateStore,
};

pub mod triage;


const SERVICE: &str = "source-host";

/// Collaborator calls an entry needs at most (triage lists, then files).
const CALLS_PER_ENTRY: u32 = 2;

/// Slack added to an entry lease for the store round-trips around the calls.
const LEASE_MARGIN: Duration = Duration::from_secs(30);

static NEXT_EXECUTOR: AtomicU64 = AtomicU64::new(0);

fn executor_id() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        NEXT_EXECUTOR.fetch_add(1, Ordering::Relaxed)
    )
}

/// Executes daily plans.
pub struct PlanExecutor {
    store: StateStore,
    source_host: Option<Arc<dyn SourceHost>>,
    retry: RetryPolicy,
    call_timeout: Duration,
    dry_run: bool,
    base_branch: String,
    recent_limit: usize,
    shutdown: Option<watch::Receiver<bool>>,
    owner: String,
}

impl PlanExecutor {
    pub fn new(store: StateStore, source_host: Option<Arc<dyn SourceHost>>, config: &Config) -> Self {
        Self {
            store,
            source_host,
            retry: RetryPolicy::from(&config.retry),
            call_timeout: config.call_timeout(),
            dry_run: config.dry_run,
            base_branch: config.base_branch.clone(),
            recent_limit: config.recent_actions_limit,
            shutdown: None,
            owner: executor_id(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = limit;
        self
    }

    /// Stops the pass between entries once the receiver reads `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Upper bound on how long one entry can keep its claim: every call of
    /// the entry exhausting its retries, each attempt hitting the timeout.
    fn entry_lease(&self) -> Duration {
        let backoff: Duration = (0..self.retry.max_attempts)
            .map(|retries| self.retry.backoff(retries))
            .sum();
        let per_call = self
            .call_timeout
            .saturating_mul(self.retry.max_attempts)
            .saturating_add(backoff);
        per_call
            .saturating_mul(CALLS_PER_ENTRY)
            .saturating_add(LEASE_MARGIN)
    }

    /// Executes every pending entry of the plan for `date`.
    ///
    /// An `executed` plan is returned as stored without any collaborator
    /// call. Entries claimed by another executor are left to it; the pass
    /// that resolves the last entry marks the plan `executed`. Entry failures
    /// are recorded on the entry and never abort the pass; only store
    /// failures are returned as errors.
    pub async fn execute(&self, date: Date) -> Result<DailyPlan> {
        let plan = self
            .store
            .get_plan(date)
            .await?
            .ok_or(ForemanError::PlanNotFound { date })?;

        if plan.is_executed() {
            log::info!("Plan for {date} already executed, nothing to do");
            return Ok(plan);
        }

        let mut status = plan.status;
        let pending = plan
            .entries
            .iter()
            .filter(|entry| entry.status == EntryStatus::Pending);

        for entry in pending {
            if self.shutdown_requested() {
                log::info!(
                    "Shutdown requested, leaving plan {date} at entry {}",
                    entry.position
                );
                return self.reload(date).await;
            }

            let claimed = self
                .store
                .claim_entry(date, entry.position, &self.owner, self.entry_lease())
                .await?;
            if !claimed {
                log::debug!(
                    "Plan {date} entry {} is resolved or claimed elsewhere, skipping",
                    entry.position
                );
                continue;
            }

            if status == PlanStatus::Planned {
                status = self.store.set_plan_status(date, PlanStatus::Executing).await?;
            }

            let pass = catalog::triage_pass(&plan.entries, entry);
            self.run_claimed(date, entry, pass).await?;
        }

        let plan = self.reload(date).await?;
        if plan.has_pending() || plan.is_executed() {
            return Ok(plan);
        }

        self.store.set_plan_status(date, PlanStatus::Executed).await?;
        let plan = self.reload(date).await?;
        let tally = plan.tally();
        log::info!(
            "Plan {date} executed: {} succeeded, {} failed, {} skipped",
            tally.succeeded,
            tally.failed,
            tally.skipped
        );
        Ok(plan)
    }

    /// Runs an entry this executor holds the claim on and records the
    /// outcome. A store failure releases the claim before propagating.
    async fn run_claimed(&self, date: Date, entry: &PlanEntry, pass: usize) -> Result<()> {
        let resolution = match self.perform(date, entry, pass).await {
            Ok(resolution) => resolution,
            Err(error) => {
                if let Err(release) = self
                    .store
                    .release_entry(date, entry.position, &self.owner)
                    .await
                {
                    log::warn!(
                        "Plan {date} entry {} keeps its claim until the lease expires: {release}",
                        entry.position
                    );
                }
                return Err(error);
            }
        };

        let outcome = resolution.status;
        let recorded = self
            .store
            .resolve_entry(date, resolution, self.recent_limit)
            .await?;

        if recorded {
            log::info!(
                "Plan {date} entry {} {} {}: {}",
                entry.position,
                entry.kind.as_str(),
                entry.target,
                outcome.as_str()
            );
        } else {
            log::warn!(
                "Plan {date} entry {} was already resolved elsewhere",
                entry.position
            );
        }
        Ok(())
    }

    async fn reload(&self, date: Date) -> Result<DailyPlan> {
        self.store
            .get_plan(date)
            .await?
            .ok_or(ForemanError::PlanNotFound { date })
    }

    /// Decides and runs one entry. Collaborator failures become a failed
    /// resolution; only store errors propagate.
    async fn perform(&self, date: Date, entry: &PlanEntry, pass: usize) -> Result<EntryResolution> {
        if self.dry_run {
            return Ok(skipped(
                entry,
                "dry-run",
                format!("Dry run: {}", entry.instruction),
            ));
        }

        if entry.kind == ActionKind::CreateRepository {
            let repositories = self.store.list_repositories().await?;
            if repositories
                .iter()
                .any(|repo| repo.name.eq_ignore_ascii_case(&entry.target))
            {
                return Ok(skipped(
                    entry,
                    "precondition",
                    format!("Repository {} already exists", entry.target),
                ));
            }
        }

        let Some(host) = self.source_host.as_ref() else {
            let error = CollaboratorError::permanent(
                SERVICE,
                PermanentKind::NotConfigured,
                "no source host configured",
            );
            return Ok(resolve(
                entry,
                RetryOutcome {
                    result: Err(error),
                    attempts: 0,
                },
            ));
        };

        let label = format!("{date} #{} {}", entry.position, entry.kind.as_str());
        let outcome = match entry.kind {
            ActionKind::CreateRepository => {
                let description = match entry.idea_id {
                    Some(id) => self.store.get_idea(id).await?.map(|idea| idea.description),
                    None => None,
                }
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| entry.instruction.clone());

                self.call(&label, || host.create_repository(&entry.target, &description))
                    .await
            }
            ActionKind::OpenFeatureBranch => {
                let branch = catalog::branch_name(&entry.target, date);
                self.call(&label, || {
                    host.create_branch(&entry.target, &self.base_branch, &branch)
                })
                .await
            }
            ActionKind::FileIssue => {
                self.file_triage_issue(&**host, &label, date, entry, pass)
                    .await
            }
        };

        Ok(resolve(entry, outcome))
    }

    async fn file_triage_issue(
        &self,
        host: &dyn SourceHost,
        label: &str,
        date: Date,
        entry: &PlanEntry,
        pass: usize,
    ) -> RetryOutcome<String> {
        let listed = self.call(label, || host.list_issues(&entry.target)).await;
        let issues = match listed.result {
            Ok(issues) => issues,
            Err(error) => {
                return RetryOutcome {
                    result: Err(error),
                    attempts: listed.attempts,
                }
            }
        };

        let title = catalog::triage_issue_title(date, pass);
        let body = triage::render_report(&entry.target, date, &issues);
        let created = self
            .call(label, || host.create_issue(&entry.target, &title, &body))
            .await;

        RetryOutcome {
            result: created
                .result
                .map(|number| format!("{}#{number}", entry.target)),
            attempts: listed.attempts + created.attempts,
        }
    }

    /// One collaborator call under the retry policy, each attempt bounded by
    /// the call timeout.
    async fn call<T, F, Fut>(&self, label: &str, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CollabResult<T>>,
    {
        self.retry
            .run(label, || with_timeout(SERVICE, self.call_timeout, call()))
            .await
    }
}

fn skipped(entry: &PlanEntry, classification: &str, message: String) -> EntryResolution {
    log::info!("Skipping entry {}: {message}", entry.position);
    EntryResolution {
        position: entry.position,
        status: EntryStatus::Skipped,
        reference: None,
        error: Some(EntryError {
            classification: classification.to_string(),
            message,
        }),
        attempts: 0,
    }
}

fn resolve(entry: &PlanEntry, outcome: RetryOutcome<String>) -> EntryResolution {
    match outcome.result {
        Ok(reference) => EntryResolution {
            position: entry.position,
            status: EntryStatus::Succeeded,
            reference: Some(reference),
            error: None,
            attempts: outcome.attempts,
        },
        Err(error) => {
            log::warn!(
                "Entry {} ({} {}) failed after {} attempt(s): {error}",
                entry.position,
                entry.kind.as_str(),
                entry.target,
                outcome.attempts
            );
            EntryResolution {
                position: entry.position,
                status: EntryStatus::Failed,
                reference: None,
                error: Some(EntryError {
                    classification: error.classification().to_string(),
                    message: error.to_string(),
                }),
                attempts: outcome.attempts,
            }
        }
    }
}
