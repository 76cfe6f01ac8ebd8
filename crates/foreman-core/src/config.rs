//! Agent configuration.
//!
//! Settings come from a TOML file (`$XDG_CONFIG_HOME/foreman/config.toml` by
//! default) with secrets and deployment knobs overridable from the
//! environment. A missing file yields the defaults.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{ForemanError, Result};

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Exact number of entries in every daily plan
    pub max_actions_per_day: u32,

    /// Resolve every entry as skipped instead of calling the source host
    pub dry_run: bool,

    /// UTC hour at which the daemon runs the daily cycle
    pub daily_run_hour_utc: u8,

    /// Upper bound for a single collaborator call, in seconds
    pub call_timeout_secs: u64,

    /// Length of the recent-actions audit trail kept in the state
    pub recent_actions_limit: usize,

    /// Open issues untouched for this many days are closed by maintenance
    pub stale_issue_days: u32,

    /// Proposals requested per idea-generation run
    pub ideas_per_batch: u32,

    /// Branch new feature branches are cut from
    pub base_branch: String,

    pub retry: RetryConfig,
    pub github: GithubConfig,
    pub groq: GroqConfig,
    pub smtp: SmtpConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per collaborator call, including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub org: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroqConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address; falls back to `username`
    pub from: Option<String>,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChatConfig {
    /// Discord-compatible incoming webhook
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_actions_per_day: 3,
            dry_run: false,
            daily_run_hour_utc: 0,
            call_timeout_secs: 30,
            recent_actions_limit: 20,
            stale_issue_days: 14,
            ideas_per_batch: 5,
            base_branch: "main".to_string(),
            retry: RetryConfig::default(),
            github: GithubConfig::default(),
            groq: GroqConfig::default(),
            smtp: SmtpConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            org: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "mixtral-8x7b".to_string(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from: None,
            recipients: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or from the default location when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// An explicitly given path must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ForemanError::configuration(format!(
                        "Config file {} does not exist",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_config_path(),
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ForemanError::FileSystem {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| {
            ForemanError::configuration(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    fn default_config_path() -> Option<PathBuf> {
        xdg::BaseDirectories::with_prefix("foreman").find_config_file("config.toml")
    }

    /// Overrides settings from environment variables looked up via `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(org) = non_empty("GITHUB_ORG") {
            self.github.org = Some(org);
        }
        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.groq.api_key = Some(key);
        }
        if let Some(model) = non_empty("GROQ_MODEL") {
            self.groq.model = model;
        }
        if let Some(host) = non_empty("SMTP_HOST") {
            self.smtp.host = Some(host);
        }
        if let Some(port) = non_empty("SMTP_PORT") {
            self.smtp.port = parse_env("SMTP_PORT", &port)?;
        }
        if let Some(user) = non_empty("SMTP_USER") {
            self.smtp.username = Some(user);
        }
        if let Some(pass) = non_empty("SMTP_PASS") {
            self.smtp.password = Some(pass);
        }
        if let Some(recipients) = non_empty("STATUS_REPORT_RECIPIENTS") {
            self.smtp.recipients = recipients
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = non_empty("CHAT_WEBHOOK_URL") {
            self.chat.webhook_url = Some(url);
        }
        if let Some(max) = non_empty("MAX_AUTO_CREATIONS_PER_DAY") {
            self.max_actions_per_day = parse_env("MAX_AUTO_CREATIONS_PER_DAY", &max)?;
        }
        if let Some(dry_run) = non_empty("DRY_RUN") {
            self.dry_run = parse_flag("DRY_RUN", &dry_run)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_actions_per_day == 0 {
            return Err(ForemanError::configuration(
                "max_actions_per_day must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ForemanError::configuration(
                "retry.max_attempts must be at least 1",
            ));
        }
        if self.daily_run_hour_utc > 23 {
            return Err(ForemanError::configuration(
                "daily_run_hour_utc must be between 0 and 23",
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(ForemanError::configuration(
                "call_timeout_secs must be greater than 0",
            ));
        }
        if self.base_branch.trim().is_empty() {
            return Err(ForemanError::configuration("base_branch must not be empty"));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ForemanError::configuration(format!("{key} has an invalid value: {raw}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ForemanError::configuration(format!(
            "{key} must be a boolean, got {raw}"
        ))),
    }
}
