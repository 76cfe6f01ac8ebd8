//! Markdown presentation of models and operation outcomes.
//!
//! Models implement [`std::fmt::Display`] in [`models`]; lists are wrapped in
//! the newtypes of [`collections`]; the digest, report outcomes, maintenance
//! runs and status snapshots render in [`reports`]. The CLI passes the text
//! to its terminal renderer, the MCP server returns it unchanged and the
//! reporter uses the digest text as the notification body.

pub mod collections;
pub mod datetime;
pub mod models;
pub mod reports;
pub mod status;

pub use collections::{Ideas, PlanSummaries, Repositories};
pub use datetime::{LocalDateTime, MaybeDateTime};
pub use status::OperationStatus;
