//! Parameter structures shared by the CLI and the MCP server.
//!
//! Interfaces wrap these in their own framework-specific types (clap `Args`,
//! transparent MCP request wrappers) and convert into them, so the core stays
//! free of interface dependencies. JSON schemas are derived only with the
//! `schema` feature.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::{
    agent::today,
    error::{ForemanError, Result},
};

/// Default number of plans returned by a listing.
pub const DEFAULT_PLAN_LIMIT: u32 = 7;

/// Parameters for operations keyed by a plan date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PlanDate {
    /// Plan date as YYYY-MM-DD; today (UTC) when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl PlanDate {
    pub fn today() -> Self {
        Self::default()
    }

    /// The requested date, or today in UTC.
    pub fn resolve(&self) -> Result<Date> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => Ok(today()),
            Some(text) => text.parse::<Date>().map_err(|e| {
                ForemanError::invalid_input("date")
                    .with_reason(format!("Expected YYYY-MM-DD, got {text:?}: {e}"))
            }),
        }
    }
}

/// Parameters for listing recent plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListPlans {
    /// Maximum number of plans to return, newest first
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PLAN_LIMIT
}

impl Default for ListPlans {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PLAN_LIMIT,
        }
    }
}
