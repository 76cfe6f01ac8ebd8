//! The status digest delivered once per day.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use crate::models::{DailyPlan, OrgState};

/// Snapshot of the organization state and the day's plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Digest {
    pub date: Date,

    /// Organization the agent works for, when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    pub state: OrgState,

    /// `None` when no plan was built for the date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<DailyPlan>,

    pub generated_at: Timestamp,
}

impl Digest {
    pub fn subject(&self) -> String {
        format!("Foreman Status Report - {}", self.date)
    }
}

/// Outcome of delivering through one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delivery {
    pub channel: String,
    /// `None` on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened when the daily report was requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    /// The report was claimed and handed to every channel
    Sent,
    /// The report for this date was already claimed earlier
    AlreadySent,
    /// No notification channel is configured; nothing was claimed
    NoChannels,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportOutcome {
    pub date: Date,
    pub status: ReportStatus,
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
}

impl ReportOutcome {
    pub fn delivered_count(&self) -> usize {
        self.deliveries.iter().filter(|d| d.error.is_none()).count()
    }
}
