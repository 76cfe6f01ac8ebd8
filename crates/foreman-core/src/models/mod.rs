//! Data models for organization state, ideas, repositories and daily plans.
//!
//! Display implementations for these models live in
//! [`crate::display::models`] so that the structures stay free of
//! presentation logic.
//!
//! # Lifecycles
//!
//! - [`OrgState`] is a singleton owned by the state store. It starts zeroed and
//!   is persisted after every mutation.
//! - [`Idea`] records are immutable once ranked.
//! - [`DailyPlan`] moves `planned → executing → executed`; each
//!   [`PlanEntry`] moves `pending → succeeded | failed | skipped`. Neither
//!   transition ever regresses.

pub mod idea;
pub mod plan;
pub mod repository;
pub mod state;
pub mod status;


pub use idea::{Idea, Proposal, ScoredProposal};
pub use plan::{DailyPlan, EntryError, EntryTally, PlanEntry};
pub use repository::{IssueSummary, Repository};
pub use state::{ActionRecord, Counters, OrgState};
pub use status::{ActionKind, EntryStatus, PlanStatus};
