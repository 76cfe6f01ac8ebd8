//! External collaborators: the source host, the text generator, trend
//! sources and notification channels.
//!
//! Each collaborator is a trait object so the agent can run against the real
//! HTTP implementations or against scripted fakes. Every failure is reported
//! as a [`CollaboratorError`], already classified as transient or permanent.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    config::Config,
    error::{CollaboratorError, Result},
    models::{IssueSummary, Proposal, Repository, ScoredProposal},
};

pub mod chat;
pub mod email;
pub mod github;
pub mod groq;
pub mod hackernews;
mod http;

pub use chat::WebhookNotifier;
pub use email::EmailNotifier;
pub use github::GithubClient;
pub use groq::GroqClient;
pub use hackernews::HackerNewsSource;

/// Result of a collaborator call.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Repository hosting service acting on the configured organization.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Creates a repository and returns its URL.
    async fn create_repository(&self, name: &str, description: &str) -> CollabResult<String>;

    /// Creates `branch` from the tip of `base` and returns the new ref.
    async fn create_branch(&self, repo: &str, base: &str, branch: &str) -> CollabResult<String>;

    /// Opens an issue and returns its number.
    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> CollabResult<u64>;

    /// Lists open issues and pull requests.
    async fn list_issues(&self, repo: &str) -> CollabResult<Vec<IssueSummary>>;

    async fn close_issue(&self, repo: &str, number: u64) -> CollabResult<()>;

    async fn list_repositories(&self) -> CollabResult<Vec<Repository>>;
}

/// Generative text service used for idea generation and ranking.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> CollabResult<String>;

    /// Scores every proposal; the output order is not significant.
    async fn rank(&self, proposals: &[Proposal]) -> CollabResult<Vec<ScoredProposal>>;
}

/// Source of trending headlines used to seed idea generation.
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn headlines(&self, limit: usize) -> CollabResult<Vec<String>>;
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// A delivery channel for reports and notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> CollabResult<()>;
}

/// The set of collaborators an agent works with. Absent collaborators are
/// `None`; operations needing them fail with a not-configured error.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub source_host: Option<Arc<dyn SourceHost>>,
    pub text_generator: Option<Arc<dyn TextGenerator>>,
    pub trend_source: Option<Arc<dyn TrendSource>>,
    pub notifiers: Vec<Arc<dyn Notifier>>,
}

impl Collaborators {
    /// Builds the HTTP-backed collaborators for every service the
    /// configuration has credentials for.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.call_timeout();
        let mut collaborators = Self::default();

        match (&config.github.token, &config.github.org) {
            (Some(_), Some(_)) => {
                collaborators.source_host = Some(Arc::new(GithubClient::new(&config.github, timeout)?));
            }
            _ => log::debug!("GitHub token or organization missing, source host disabled"),
        }

        if config.groq.api_key.is_some() {
            collaborators.text_generator = Some(Arc::new(GroqClient::new(&config.groq, timeout)?));
        } else {
            log::debug!("GROQ_API_KEY missing, text generation disabled");
        }

        collaborators.trend_source = Some(Arc::new(HackerNewsSource::new(timeout)?));

        if let Some(notifier) = EmailNotifier::from_config(&config.smtp, timeout)? {
            collaborators.notifiers.push(Arc::new(notifier));
        }
        if let Some(url) = &config.chat.webhook_url {
            collaborators.notifiers.push(Arc::new(WebhookNotifier::new(url, timeout)?));
        }

        Ok(collaborators)
    }

    pub fn source_host(&self) -> CollabResult<&Arc<dyn SourceHost>> {
        self.source_host
            .as_ref()
            .ok_or_else(|| not_configured("github", "GITHUB_TOKEN and GITHUB_ORG are required"))
    }

    pub fn text_generator(&self) -> CollabResult<&Arc<dyn TextGenerator>> {
        self.text_generator
            .as_ref()
            .ok_or_else(|| not_configured("groq", "GROQ_API_KEY is required"))
    }
}

fn not_configured(service: &str, message: &str) -> CollaboratorError {
    CollaboratorError::permanent(service, crate::error::PermanentKind::NotConfigured, message)
}

/// Bounds `call` by `limit`; running out of time is a transient failure.
pub async fn with_timeout<T, F>(service: &str, limit: Duration, call: F) -> CollabResult<T>
where
    F: Future<Output = CollabResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::transient(
            service,
            format!("call timed out after {}ms", limit.as_millis()),
        )),
    }
}
