//! The agent: owns the store, the configuration and the collaborators, and
//! exposes the control operations.
//!
//! Every operation holds a single agent-wide lock for its whole duration, so
//! timer-driven and on-demand triggers never interleave their
//! read-modify-write sequences. Status queries read the last persisted state
//! and take no lock.

use std::sync::Arc;

use jiff::{civil::Date, tz::TimeZone, SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::{
    collaborators::{with_timeout, Collaborators, SourceHost},
    config::Config,
    error::{ForemanError, Result},
    executor::PlanExecutor,
    models::{DailyPlan, Idea, IssueSummary, OrgState, Repository},
    planner::{DailyPlanner, MaintenancePolicy, RoundRobinTriage},
    ranker::IdeaRanker,
    reporter::{ReportOutcome, Reporter},
    retry::RetryPolicy,
    store::StateStore,
};

/// Today's date in UTC, the key of daily plans.
pub fn today() -> Date {
    Timestamp::now().to_zoned(TimeZone::UTC).date()
}

/// Result of a maintenance run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Repositories known after syncing
    pub repositories: usize,
    pub issues_closed: u64,
    pub prs_open: u64,
    /// Per-repository problems; they do not abort the run
    #[serde(default)]
    pub failures: Vec<String>,
}

/// Read-only view of the agent for status queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub date: Date,
    pub state: OrgState,
    pub plan: Option<DailyPlan>,
    pub ideas: Vec<Idea>,
    pub repositories: Vec<Repository>,
}

/// Outcome of one daily cycle; each step records its own error.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub ideas: Option<usize>,
    pub plan: Option<DailyPlan>,
    pub maintenance: Option<MaintenanceReport>,
    pub report: Option<ReportOutcome>,
    pub errors: Vec<String>,
}

pub struct Agent {
    config: Config,
    store: StateStore,
    collaborators: Collaborators,
    policy: Arc<dyn MaintenancePolicy>,
    retry: RetryPolicy,
    lock: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Agent {
    pub fn new(config: Config, store: StateStore, collaborators: Collaborators) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            retry: RetryPolicy::from(&config.retry),
            config,
            store,
            collaborators,
            policy: Arc::new(RoundRobinTriage),
            lock: Mutex::new(()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn with_maintenance_policy(mut self, policy: Arc<dyn MaintenancePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the retry policy from the configuration.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Asks running and future operations to stop at the next safe point.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// A receiver that flips to `true` when shutdown is requested.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Generates and ranks today's idea batch.
    pub async fn generate_ideas(&self, date: Date) -> Result<Vec<Idea>> {
        let _guard = self.lock.lock().await;
        IdeaRanker::new(
            self.store.clone(),
            self.collaborators.text_generator.clone(),
            self.collaborators.trend_source.clone(),
            &self.config,
        )
        .with_retry(self.retry)
        .generate(date)
        .await
    }

    /// Builds the plan for `date`, or returns the existing one.
    pub async fn build_plan(&self, date: Date) -> Result<DailyPlan> {
        let _guard = self.lock.lock().await;
        DailyPlanner::new(self.store.clone(), self.config.max_actions_per_day as usize)
            .with_policy(self.policy.clone())
            .plan_for(date)
            .await
    }

    /// Executes the pending entries of the plan for `date`.
    pub async fn execute_plan(&self, date: Date) -> Result<DailyPlan> {
        let _guard = self.lock.lock().await;
        PlanExecutor::new(
            self.store.clone(),
            self.collaborators.source_host.clone(),
            &self.config,
        )
        .with_retry(self.retry)
        .with_shutdown(self.shutdown_rx.clone())
        .execute(date)
        .await
    }

    /// Syncs the repository registry, closes stale issues and counts open
    /// pull requests.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport> {
        let _guard = self.lock.lock().await;
        let host = self.collaborators.source_host()?.clone();
        let timeout = self.config.call_timeout();
        let mut report = MaintenanceReport::default();

        let listed = self
            .retry
            .run("list repositories", || {
                with_timeout("source-host", timeout, host.list_repositories())
            })
            .await
            .result?;
        self.store.upsert_repositories(listed).await?;
        let repositories = self.store.list_repositories().await?;
        report.repositories = repositories.len();

        let cutoff = Timestamp::now()
            .checked_sub(SignedDuration::from_hours(
                i64::from(self.config.stale_issue_days) * 24,
            ))
            .unwrap_or(Timestamp::MIN);

        for repo in &repositories {
            if self.is_shutting_down() {
                log::info!("Shutdown requested, stopping maintenance");
                break;
            }

            let issues = match self
                .retry
                .run("list issues", || {
                    with_timeout("source-host", timeout, host.list_issues(&repo.name))
                })
                .await
                .result
            {
                Ok(issues) => issues,
                Err(e) => {
                    log::warn!("Maintenance skipped {}: {e}", repo.name);
                    report.failures.push(format!("{}: {e}", repo.name));
                    continue;
                }
            };

            report.prs_open += issues.iter().filter(|i| i.is_pull_request).count() as u64;

            self.close_stale(&*host, &repo.name, &issues, cutoff, &mut report)
                .await;
        }

        let (closed, prs_open) = (report.issues_closed, report.prs_open);
        self.store
            .update(move |state| {
                state.counters.issues_closed += closed;
                state.counters.prs_open = prs_open;
            })
            .await?;

        log::info!(
            "Maintenance done: {} repositories, {} issue(s) closed, {} open PR(s)",
            report.repositories,
            report.issues_closed,
            report.prs_open
        );
        Ok(report)
    }

    /// Closes the issues of `repo` untouched since `cutoff`. Failures are
    /// noted in the report and do not stop the sweep.
    async fn close_stale(
        &self,
        host: &dyn SourceHost,
        repo: &str,
        issues: &[IssueSummary],
        cutoff: Timestamp,
        report: &mut MaintenanceReport,
    ) {
        let timeout = self.config.call_timeout();
        let stale = issues
            .iter()
            .filter(|i| !i.is_pull_request)
            .filter(|i| i.updated_at.is_some_and(|at| at < cutoff));
        for issue in stale {
            if self.config.dry_run {
                log::info!("Dry run: would close stale issue {repo}#{}", issue.number);
                continue;
            }
            let closed = self
                .retry
                .run("close issue", || {
                    with_timeout("source-host", timeout, host.close_issue(repo, issue.number))
                })
                .await
                .result;
            match closed {
                Ok(()) => {
                    log::info!("Closed stale issue {repo}#{}", issue.number);
                    report.issues_closed += 1;
                }
                Err(e) => {
                    log::warn!("Could not close {repo}#{}: {e}", issue.number);
                    report.failures.push(format!("{repo}#{}: {e}", issue.number));
                }
            }
        }
    }

    fn reporter(&self) -> Reporter {
        Reporter::new(
            self.store.clone(),
            self.collaborators.notifiers.clone(),
            &self.config,
        )
        .with_retry(self.retry)
    }

    /// Sends the daily report for `date` if it has not been sent yet.
    pub async fn report_status(&self, date: Date) -> Result<ReportOutcome> {
        let _guard = self.lock.lock().await;
        self.reporter().report(date).await
    }

    /// Sends the one-time startup notice. Returns whether it was sent now.
    pub async fn announce_startup(&self) -> Result<bool> {
        let _guard = self.lock.lock().await;
        self.reporter().announce_startup().await
    }

    /// Last persisted state, plan and ideas for `date`.
    pub async fn status(&self, date: Date) -> Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            date,
            state: self.store.load().await?,
            plan: self.store.get_plan(date).await?,
            ideas: self.store.latest_ideas().await?,
            repositories: self.store.list_repositories().await?,
        })
    }

    /// Runs ideas → plan → execute → maintain → report for `date`.
    ///
    /// Steps whose collaborators are not configured are skipped; a failing
    /// step is recorded and the cycle moves on.
    pub async fn run_daily_cycle(&self, date: Date) -> CycleSummary {
        let mut summary = CycleSummary::default();
        log::info!("Starting daily cycle for {date}");

        if self.collaborators.text_generator.is_some() {
            match self.generate_ideas(date).await {
                Ok(ideas) => summary.ideas = Some(ideas.len()),
                Err(e) => record(&mut summary, "ideas", &e),
            }
        }

        match self.build_plan(date).await {
            Ok(_) => match self.execute_plan(date).await {
                Ok(plan) => summary.plan = Some(plan),
                Err(e) => record(&mut summary, "execute", &e),
            },
            Err(e) => record(&mut summary, "plan", &e),
        }

        if self.collaborators.source_host.is_some() && !self.is_shutting_down() {
            match self.run_maintenance().await {
                Ok(report) => summary.maintenance = Some(report),
                Err(e) => record(&mut summary, "maintenance", &e),
            }
        }

        match self.report_status(date).await {
            Ok(outcome) => summary.report = Some(outcome),
            Err(e) => record(&mut summary, "report", &e),
        }

        log::info!(
            "Daily cycle for {date} finished with {} error(s)",
            summary.errors.len()
        );
        summary
    }
}

fn record(summary: &mut CycleSummary, step: &str, error: &ForemanError) {
    log::error!("Daily cycle step {step} failed: {error}");
    summary.errors.push(format!("{step}: {error}"));
}
