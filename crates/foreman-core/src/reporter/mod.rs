//! Reporter: assembles the daily digest and hands it to every notification
//! channel, at most once per date.

use std::{sync::Arc, time::Duration};

use jiff::{civil::Date, Timestamp};

use crate::{
    collaborators::{with_timeout, Notification, Notifier},
    config::Config,
    error::Result,
    retry::RetryPolicy,
    store::StateStore,
};

pub mod digest;

pub use digest::{Delivery, Digest, ReportOutcome, ReportStatus};

/// Key claimed for the one-time startup notice.
pub const STARTUP_FLAG: &str = "startup_message";

/// Key claimed when the report for `date` is sent.
pub fn report_flag(date: Date) -> String {
    format!("daily_report_{date}")
}

pub struct Reporter {
    store: StateStore,
    notifiers: Vec<Arc<dyn Notifier>>,
    retry: RetryPolicy,
    call_timeout: Duration,
    organization: Option<String>,
}

impl Reporter {
    pub fn new(store: StateStore, notifiers: Vec<Arc<dyn Notifier>>, config: &Config) -> Self {
        Self {
            store,
            notifiers,
            retry: RetryPolicy::from(&config.retry),
            call_timeout: config.call_timeout(),
            organization: config.github.org.clone(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the digest for `date` from the last persisted state.
    pub async fn digest(&self, date: Date) -> Result<Digest> {
        Ok(Digest {
            date,
            organization: self.organization.clone(),
            state: self.store.load().await?,
            plan: self.store.get_plan(date).await?,
            generated_at: Timestamp::now(),
        })
    }

    /// Sends the daily report for `date` unless it was already sent.
    ///
    /// The digest is built first and the date claimed only once a message
    /// exists, so a store failure while reading leaves the day unclaimed.
    /// The claim precedes delivery, so a report is never sent twice even if
    /// every channel fails. Channel failures are logged and recorded in the
    /// outcome, not returned as errors.
    pub async fn report(&self, date: Date) -> Result<ReportOutcome> {
        if self.notifiers.is_empty() {
            log::info!("No notification channel configured, report for {date} not sent");
            return Ok(ReportOutcome {
                date,
                status: ReportStatus::NoChannels,
                deliveries: Vec::new(),
            });
        }

        let digest = self.digest(date).await?;
        let notification = Notification {
            subject: digest.subject(),
            body: digest.to_string(),
        };

        if !self.store.mark_one_time(&report_flag(date)).await? {
            log::info!("Report for {date} already sent");
            return Ok(ReportOutcome {
                date,
                status: ReportStatus::AlreadySent,
                deliveries: Vec::new(),
            });
        }

        let deliveries = self.deliver(&notification).await;

        Ok(ReportOutcome {
            date,
            status: ReportStatus::Sent,
            deliveries,
        })
    }

    /// Sends the startup notice the first time the agent starts against this
    /// state. Returns whether it was sent now.
    pub async fn announce_startup(&self) -> Result<bool> {
        if self.notifiers.is_empty() {
            return Ok(false);
        }

        let organization = self.organization.as_deref().unwrap_or("(unset)");
        let notification = Notification {
            subject: "Foreman is online".to_string(),
            body: format!(
                "Foreman started at {} and will manage the {organization} organization. \
                 Daily status reports follow on this channel.",
                Timestamp::now()
            ),
        };
        if !self.store.mark_one_time(STARTUP_FLAG).await? {
            return Ok(false);
        }
        self.deliver(&notification).await;
        Ok(true)
    }

    async fn deliver(&self, notification: &Notification) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(self.notifiers.len());
        for notifier in &self.notifiers {
            let channel = notifier.name().to_string();
            let outcome = self
                .retry
                .run(&channel, || {
                    with_timeout(&channel, self.call_timeout, notifier.send(notification))
                })
                .await;

            let error = match outcome.result {
                Ok(()) => {
                    log::info!("Delivered \"{}\" via {channel}", notification.subject);
                    None
                }
                Err(e) => {
                    log::warn!("Delivery via {channel} failed: {e}");
                    Some(e.to_string())
                }
            };
            deliveries.push(Delivery { channel, error });
        }
        deliveries
    }
}
