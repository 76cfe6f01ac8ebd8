//! Core library for Foreman, an automation agent that runs a GitHub
//! organization on a daily cycle.
//!
//! Each day the agent generates and ranks project ideas, turns the best of
//! them (plus maintenance work) into a plan of exactly N actions, executes the
//! plan against the source host, tidies existing repositories and sends one
//! status digest. All state lives in a single SQLite database so that every
//! step can be repeated after a crash without doing the work twice.
//!
//! # Layout
//!
//! - [`store`]: async facade over the database ([`StateStore`])
//! - [`planner`], [`executor`], [`reporter`], [`ranker`]: the cycle steps
//! - [`collaborators`]: traits for external services and their HTTP/SMTP
//!   implementations
//! - [`agent`]: ties the steps together under one lock; [`scheduler`] runs
//!   it daily
//! - [`display`]: markdown rendering for every model and outcome
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use foreman_core::{Agent, Collaborators, Config, StateStoreBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let store = StateStoreBuilder::new()
//!     .with_database_path(Some("foreman.db"))
//!     .build()
//!     .await?;
//! let collaborators = Collaborators::from_config(&config)?;
//!
//! let agent = Agent::new(config, store, collaborators);
//! let summary = agent.run_daily_cycle(foreman_core::today()).await;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod executor;
pub mod models;
pub mod params;
pub mod planner;
pub mod ranker;
pub mod reporter;
pub mod retry;
pub mod scheduler;
pub mod store;

pub use agent::{today, Agent, CycleSummary, MaintenanceReport, StatusSnapshot};
pub use collaborators::{Collaborators, Notification, Notifier, SourceHost, TextGenerator, TrendSource};
pub use config::Config;
pub use db::Database;
pub use display::{Ideas, LocalDateTime, OperationStatus, PlanSummaries, Repositories};
pub use error::{CollaboratorError, ForemanError, PermanentKind, Result};
pub use executor::PlanExecutor;
pub use models::{
    ActionKind, DailyPlan, EntryStatus, Idea, OrgState, PlanEntry, PlanStatus, Repository,
};
pub use params::{ListPlans, PlanDate};
pub use planner::{DailyPlanner, MaintenancePolicy, RoundRobinTriage};
pub use ranker::IdeaRanker;
pub use reporter::{Digest, ReportOutcome, ReportStatus, Reporter};
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;
pub use store::{StateStore, StateStoreBuilder};
