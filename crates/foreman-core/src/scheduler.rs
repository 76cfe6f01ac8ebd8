//! Daily scheduler for the long-running agent.
//!
//! On start the scheduler sends the one-time startup notice and runs a
//! catch-up cycle for today (every step is idempotent), then sleeps until the
//! configured UTC hour and runs the cycle again, once per day, until shutdown
//! is requested.

use std::{sync::Arc, time::Duration};

use jiff::{civil::Time, tz::TimeZone, Timestamp};

use crate::{
    agent::{today, Agent},
    error::{ForemanError, Result},
};

/// First instant strictly after `now` at `hour`:00 UTC.
pub fn next_run_after(now: Timestamp, hour: u8) -> Result<Timestamp> {
    let invalid = |e: jiff::Error| ForemanError::configuration(format!("Invalid run hour {hour}: {e}"));

    let hour = i8::try_from(hour)
        .map_err(|_| ForemanError::configuration(format!("Invalid run hour {hour}")))?;
    let at = Time::new(hour, 0, 0, 0).map_err(invalid)?;

    let date = now.to_zoned(TimeZone::UTC).date();
    let candidate = date.to_datetime(at).to_zoned(TimeZone::UTC).map_err(invalid)?;
    if candidate.timestamp() > now {
        return Ok(candidate.timestamp());
    }

    let tomorrow = date.tomorrow().map_err(invalid)?;
    Ok(tomorrow
        .to_datetime(at)
        .to_zoned(TimeZone::UTC)
        .map_err(invalid)?
        .timestamp())
}

pub struct Scheduler {
    agent: Arc<Agent>,
}

impl Scheduler {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Runs until [`Agent::request_shutdown`] is called.
    pub async fn run(&self) -> Result<()> {
        let hour = self.agent.config().daily_run_hour_utc;
        let mut shutdown = self.agent.shutdown_signal();

        match self.agent.announce_startup().await {
            Ok(true) => log::info!("Startup notice sent"),
            Ok(false) => log::debug!("Startup notice already sent or no channel configured"),
            Err(e) => log::error!("Startup notice failed: {e}"),
        }

        loop {
            if self.agent.is_shutting_down() {
                break;
            }

            let summary = self.agent.run_daily_cycle(today()).await;
            if !summary.errors.is_empty() {
                log::warn!("Daily cycle errors: {}", summary.errors.join("; "));
            }

            let now = Timestamp::now();
            let next = next_run_after(now, hour)?;
            let wait = Duration::from_secs(now.duration_until(next).as_secs().max(0) as u64);
            log::info!("Next daily cycle at {next}");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Scheduler stopped");
        Ok(())
    }
}
