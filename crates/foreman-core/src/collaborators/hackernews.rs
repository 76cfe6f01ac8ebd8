//! Hacker News top stories as a [`TrendSource`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{http, CollabResult, TrendSource};
use crate::error::{ForemanError, Result};

const SERVICE: &str = "hackernews";
const DEFAULT_API_URL: &str = "https://hacker-news.firebaseio.com/v0";

pub struct HackerNewsSource {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
}

impl HackerNewsSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForemanError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
        })
    }
}

#[async_trait]
impl TrendSource for HackerNewsSource {
    async fn headlines(&self, limit: usize) -> CollabResult<Vec<String>> {
        let url = format!("{}/topstories.json", self.api_url);
        log::debug!("GET {url}");
        let response = http::send(SERVICE, self.client.get(&url)).await?;
        let ids: Vec<u64> = http::json(SERVICE, response).await?;

        let mut titles = Vec::with_capacity(limit);
        for id in ids.into_iter().take(limit) {
            let url = format!("{}/item/{id}.json", self.api_url);
            let response = http::send(SERVICE, self.client.get(&url)).await?;
            let item: Option<Item> = http::json(SERVICE, response).await?;
            if let Some(title) = item.and_then(|item| item.title) {
                titles.push(title);
            }
        }
        Ok(titles)
    }
}
