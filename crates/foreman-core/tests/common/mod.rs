#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use foreman_core::{
    collaborators::CollabResult,
    config::GithubConfig,
    models::{IssueSummary, Proposal, ScoredProposal},
    Agent, CollaboratorError, Collaborators, Config, Notification, Notifier, Repository,
    RetryPolicy, SourceHost, StateStore, StateStoreBuilder, TextGenerator,
};
use jiff::{civil::Date, Timestamp};
use tempfile::TempDir;

/// Helper function to create a store in a throwaway directory
pub async fn create_test_store() -> (TempDir, StateStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = StateStoreBuilder::new()
        .with_database_path(Some(temp_dir.path().join("test.db")))
        .build()
        .await
        .expect("Failed to create store");
    (temp_dir, store)
}

/// Reopens the database behind `dir`, as a restarted process would.
pub async fn reopen_store(dir: &TempDir) -> StateStore {
    StateStoreBuilder::new()
        .with_database_path(Some(dir.path().join("test.db")))
        .build()
        .await
        .expect("Failed to reopen store")
}

pub fn test_config(actions: u32) -> Config {
    Config {
        max_actions_per_day: actions,
        github: GithubConfig {
            org: Some("acme".to_string()),
            ..GithubConfig::default()
        },
        ..Config::default()
    }
}

pub fn test_agent(store: StateStore, config: Config, collaborators: Collaborators) -> Agent {
    Agent::new(config, store, collaborators).with_retry(RetryPolicy::immediate(3))
}

pub fn scored(title: &str, score: f64) -> ScoredProposal {
    ScoredProposal {
        title: title.to_string(),
        description: format!("{title} description"),
        score,
    }
}

pub fn repo(name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        idea_id: None,
        url: None,
        created_at: Timestamp::now(),
    }
}

pub fn issue(number: u64, title: &str, updated_at: Option<&str>, is_pull_request: bool) -> IssueSummary {
    IssueSummary {
        number,
        title: title.to_string(),
        updated_at: updated_at.map(|at| at.parse().expect("valid timestamp")),
        is_pull_request,
    }
}

/// Seeds the ranked ideas and the known repositories for `day`.
pub async fn seed(store: &StateStore, day: Date, ideas: Vec<ScoredProposal>, repos: &[&str]) {
    store.save_ideas(day, ideas).await.expect("Failed to seed ideas");
    store
        .upsert_repositories(repos.iter().map(|name| repo(name)).collect())
        .await
        .expect("Failed to seed repositories");
}

/// Scripted source host. Every call is recorded as `"<method> <target>"`;
/// queued failures for a method are returned before it starts succeeding.
/// With a delay set, each call sleeps that long before answering.
#[derive(Default)]
pub struct FakeSourceHost {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, VecDeque<CollaboratorError>>>,
    repositories: Mutex<Vec<Repository>>,
    issues: Mutex<HashMap<String, Vec<IssueSummary>>>,
    closed: Mutex<Vec<(String, u64)>>,
    next_issue: Mutex<u64>,
    delay: Mutex<Duration>,
    issue_titles: Mutex<Vec<String>>,
}

impl FakeSourceHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, method: &'static str, error: CollaboratorError) {
        self.failures
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(error);
    }

    pub fn with_repositories(&self, names: &[&str]) {
        self.repositories
            .lock()
            .unwrap()
            .extend(names.iter().map(|name| repo(name)));
    }

    pub fn with_issues(&self, repository: &str, issues: Vec<IssueSummary>) {
        self.issues
            .lock()
            .unwrap()
            .insert(repository.to_string(), issues);
    }

    pub fn with_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(method))
            .count()
    }

    pub fn issue_titles(&self) -> Vec<String> {
        self.issue_titles.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<(String, u64)> {
        self.closed.lock().unwrap().clone()
    }

    async fn record(&self, method: &'static str, target: &str) -> CollabResult<()> {
        self.calls.lock().unwrap().push(format!("{method} {target}"));
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SourceHost for FakeSourceHost {
    async fn create_repository(&self, name: &str, _description: &str) -> CollabResult<String> {
        self.record("create_repository", name).await?;
        self.repositories.lock().unwrap().push(repo(name));
        Ok(format!("https://github.com/acme/{name}"))
    }

    async fn create_branch(&self, repo: &str, _base: &str, branch: &str) -> CollabResult<String> {
        self.record("create_branch", repo).await?;
        Ok(format!("refs/heads/{branch}"))
    }

    async fn create_issue(&self, repo: &str, title: &str, _body: &str) -> CollabResult<u64> {
        self.record("create_issue", repo).await?;
        self.issue_titles.lock().unwrap().push(title.to_string());
        let mut next = self.next_issue.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    async fn list_issues(&self, repo: &str) -> CollabResult<Vec<IssueSummary>> {
        self.record("list_issues", repo).await?;
        Ok(self
            .issues
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn close_issue(&self, repo: &str, number: u64) -> CollabResult<()> {
        self.record("close_issue", repo).await?;
        self.closed.lock().unwrap().push((repo.to_string(), number));
        Ok(())
    }

    async fn list_repositories(&self) -> CollabResult<Vec<Repository>> {
        self.record("list_repositories", "acme").await?;
        Ok(self.repositories.lock().unwrap().clone())
    }
}

/// Text generator that answers every prompt with `reply` and scores
/// proposals from a fixed table (unknown titles score 0).
pub struct FakeTextGenerator {
    reply: String,
    scores: HashMap<String, f64>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeTextGenerator {
    pub fn new(reply: &str, scores: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            scores: scores
                .iter()
                .map(|(title, score)| (title.to_string(), *score))
                .collect(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate(&self, prompt: &str) -> CollabResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn rank(&self, proposals: &[Proposal]) -> CollabResult<Vec<ScoredProposal>> {
        Ok(proposals
            .iter()
            .map(|p| ScoredProposal {
                title: p.title.clone(),
                description: p.description.clone(),
                score: self.scores.get(&p.title).copied().unwrap_or(0.0),
            })
            .collect())
    }
}

/// Notifier that keeps what it was asked to send, or fails every time.
pub struct FakeNotifier {
    name: String,
    failure: Option<CollaboratorError>,
    pub sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failure: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str, error: CollaboratorError) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failure: Some(error),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> CollabResult<()> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
