//! GitHub REST implementation of [`SourceHost`].

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use super::{http, CollabResult, SourceHost};
use crate::{
    config::GithubConfig,
    error::{ForemanError, Result},
    models::{IssueSummary, Repository},
};

const SERVICE: &str = "github";

/// Client bound to one organization.
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    org: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    html_url: Option<String>,
    created_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    #[serde(rename = "ref")]
    git_ref: String,
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    #[serde(default)]
    title: String,
    updated_at: Option<Timestamp>,
    pull_request: Option<serde_json::Value>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig, timeout: Duration) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| ForemanError::configuration("GitHub token is not set"))?;
        let org = config
            .org
            .clone()
            .ok_or_else(|| ForemanError::configuration("GitHub organization is not set"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ForemanError::configuration(format!("Invalid GitHub token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(concat!("foreman/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ForemanError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            org,
        })
    }

    fn repo_url(&self, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, self.org, repo, path)
    }
}

#[async_trait]
impl SourceHost for GithubClient {
    async fn create_repository(&self, name: &str, description: &str) -> CollabResult<String> {
        let url = format!("{}/orgs/{}/repos", self.api_url, self.org);
        log::debug!("POST {url} name={name}");
        let body = json!({
            "name": name,
            "description": description,
            "private": false,
            "auto_init": true,
        });
        let response = http::send(SERVICE, self.client.post(&url).json(&body)).await?;
        let repo: RepoResponse = http::json(SERVICE, response).await?;
        Ok(repo
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}/{}", self.org, repo.name)))
    }

    async fn create_branch(&self, repo: &str, base: &str, branch: &str) -> CollabResult<String> {
        let base_url = self.repo_url(repo, &format!("/git/ref/heads/{base}"));
        log::debug!("GET {base_url}");
        let response = http::send(SERVICE, self.client.get(&base_url)).await?;
        let base_ref: RefResponse = http::json(SERVICE, response).await?;

        let url = self.repo_url(repo, "/git/refs");
        log::debug!("POST {url} ref={branch}");
        let body = json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": base_ref.object.sha,
        });
        let response = http::send(SERVICE, self.client.post(&url).json(&body)).await?;
        let created: RefResponse = http::json(SERVICE, response).await?;
        Ok(created.git_ref)
    }

    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> CollabResult<u64> {
        let url = self.repo_url(repo, "/issues");
        log::debug!("POST {url} title={title}");
        let payload = json!({ "title": title, "body": body });
        let response = http::send(SERVICE, self.client.post(&url).json(&payload)).await?;
        let issue: IssueResponse = http::json(SERVICE, response).await?;
        Ok(issue.number)
    }

    async fn list_issues(&self, repo: &str) -> CollabResult<Vec<IssueSummary>> {
        let url = self.repo_url(repo, "/issues");
        log::debug!("GET {url}");
        let request = self
            .client
            .get(&url)
            .query(&[("state", "open"), ("per_page", "100")]);
        let response = http::send(SERVICE, request).await?;
        let issues: Vec<IssueResponse> = http::json(SERVICE, response).await?;
        Ok(issues
            .into_iter()
            .map(|issue| IssueSummary {
                number: issue.number,
                title: issue.title,
                updated_at: issue.updated_at,
                is_pull_request: issue.pull_request.is_some(),
            })
            .collect())
    }

    async fn close_issue(&self, repo: &str, number: u64) -> CollabResult<()> {
        let url = self.repo_url(repo, &format!("/issues/{number}"));
        log::debug!("PATCH {url} state=closed");
        http::send(
            SERVICE,
            self.client.patch(&url).json(&json!({ "state": "closed" })),
        )
        .await?;
        Ok(())
    }

    async fn list_repositories(&self) -> CollabResult<Vec<Repository>> {
        let url = format!("{}/orgs/{}/repos", self.api_url, self.org);
        log::debug!("GET {url}");
        let request = self.client.get(&url).query(&[("per_page", "100")]);
        let response = http::send(SERVICE, request).await?;
        let repos: Vec<RepoResponse> = http::json(SERVICE, response).await?;
        Ok(repos
            .into_iter()
            .map(|repo| Repository {
                name: repo.name,
                idea_id: None,
                url: repo.html_url,
                created_at: repo.created_at.unwrap_or_else(Timestamp::now),
            })
            .collect())
    }
}
