//! Command handlers and clap argument wrappers.
//!
//! Argument structs carry the clap attributes and convert into the core
//! parameter types, so `foreman-core` stays free of CLI concerns.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use foreman_core::{
    display::{Ideas, OperationStatus, PlanSummaries},
    params::{ListPlans, PlanDate},
    Agent, Scheduler,
};
use log::info;
use tokio::signal::unix::{signal, SignalKind};

use crate::renderer::TerminalRenderer;

/// Date selector shared by the date-keyed commands
#[derive(Args)]
pub struct PlanDateArgs {
    /// Plan date as YYYY-MM-DD (defaults to today, UTC)
    #[arg(short, long)]
    pub date: Option<String>,
}

impl From<PlanDateArgs> for PlanDate {
    fn from(val: PlanDateArgs) -> Self {
        PlanDate { date: val.date }
    }
}

#[derive(Args)]
pub struct ListPlansArgs {
    /// Maximum number of plans to show, newest first
    #[arg(short, long, default_value_t = foreman_core::params::DEFAULT_PLAN_LIMIT)]
    pub limit: u32,
}

impl From<ListPlansArgs> for ListPlans {
    fn from(val: ListPlansArgs) -> Self {
        ListPlans { limit: val.limit }
    }
}

#[derive(Subcommand)]
pub enum IdeaCommands {
    /// Generate and rank today's ideas (reuses a batch already stored for the date)
    Generate(PlanDateArgs),
    /// Show the latest ranked batch
    List,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Build the plan for a date, or show the one already built
    Build(PlanDateArgs),
    /// Execute the pending entries of a plan
    Execute(PlanDateArgs),
    /// Show a plan with the outcome of each entry
    Show(PlanDateArgs),
    /// List recent plans
    List(ListPlansArgs),
}

pub struct Cli {
    agent: Arc<Agent>,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(agent: Arc<Agent>, renderer: TerminalRenderer) -> Self {
        Self { agent, renderer }
    }

    pub async fn handle_idea_command(&self, command: IdeaCommands) -> Result<()> {
        match command {
            IdeaCommands::Generate(args) => {
                let date = PlanDate::from(args).resolve()?;
                let ideas = self
                    .agent
                    .generate_ideas(date)
                    .await
                    .context("Failed to generate ideas")?;
                self.renderer.render(&Ideas(ideas).to_string())
            }
            IdeaCommands::List => {
                let ideas = self.agent.store().latest_ideas().await?;
                self.renderer.render(&Ideas(ideas).to_string())
            }
        }
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::Build(args) => {
                let date = PlanDate::from(args).resolve()?;
                let plan = self
                    .agent
                    .build_plan(date)
                    .await
                    .context("Failed to build plan")?;
                self.renderer.render(&plan.to_string())
            }
            PlanCommands::Execute(args) => {
                let date = PlanDate::from(args).resolve()?;
                let plan = self
                    .agent
                    .execute_plan(date)
                    .await
                    .context("Failed to execute plan")?;
                self.renderer.render(&plan.to_string())
            }
            PlanCommands::Show(args) => {
                let date = PlanDate::from(args).resolve()?;
                match self.agent.store().get_plan(date).await? {
                    Some(plan) => self.renderer.render(&plan.to_string()),
                    None => self.renderer.render(&format!("No plan for {date}.\n")),
                }
            }
            PlanCommands::List(args) => {
                let params = ListPlans::from(args);
                let plans = self.agent.store().list_plans(params.limit).await?;
                self.renderer.render(&PlanSummaries(plans).to_string())
            }
        }
    }

    pub async fn maintain(&self) -> Result<()> {
        let report = self
            .agent
            .run_maintenance()
            .await
            .context("Maintenance failed")?;
        self.renderer.render(&report.to_string())
    }

    pub async fn report(&self, args: PlanDateArgs) -> Result<()> {
        let date = PlanDate::from(args).resolve()?;
        let outcome = self
            .agent
            .report_status(date)
            .await
            .context("Failed to send report")?;
        self.renderer.render(&outcome.to_string())
    }

    pub async fn status(&self, args: PlanDateArgs) -> Result<()> {
        let date = PlanDate::from(args).resolve()?;
        let snapshot = self.agent.status(date).await?;
        self.renderer.render(&snapshot.to_string())
    }

    pub async fn run_cycle(&self, args: PlanDateArgs) -> Result<()> {
        let date = PlanDate::from(args).resolve()?;
        let summary = self.agent.run_daily_cycle(date).await;
        self.renderer.render(&summary.to_string())?;
        if summary.errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Daily cycle finished with {} error(s)", summary.errors.len())
        }
    }

    /// Runs the scheduler until SIGINT or SIGTERM. The current entry is
    /// finished and persisted before the process exits.
    pub async fn daemon(&self) -> Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let agent = self.agent.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
            }
            agent.request_shutdown();
        });

        Scheduler::new(self.agent.clone())
            .run()
            .await
            .context("Scheduler failed")?;
        self.renderer
            .render(&OperationStatus::success("Foreman stopped").to_string())
    }
}
