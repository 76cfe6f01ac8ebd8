//! Groq chat-completions implementation of [`TextGenerator`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{http, CollabResult, TextGenerator};
use crate::{
    config::GroqConfig,
    error::{CollaboratorError, ForemanError, PermanentKind, Result},
    models::{Proposal, ScoredProposal},
};

const SERVICE: &str = "groq";

const SYSTEM_PROMPT: &str =
    "You are an engineering lead curating open-source projects. Answer with JSON only.";

pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    title: String,
    score: f64,
}

impl GroqClient {
    pub fn new(config: &GroqConfig, timeout: Duration) -> Result<Self> {
        let key = config
            .api_key
            .as_deref()
            .ok_or_else(|| ForemanError::configuration("Groq API key is not set"))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| ForemanError::configuration(format!("Invalid Groq API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ForemanError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GroqClient {
    async fn generate(&self, prompt: &str) -> CollabResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        log::debug!("POST {} model={}", self.config.endpoint, self.config.model);
        let response = http::send(
            SERVICE,
            self.client.post(&self.config.endpoint).json(&body),
        )
        .await?;
        let parsed: ChatResponse = http::json(SERVICE, response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                CollaboratorError::permanent(
                    SERVICE,
                    PermanentKind::InvalidRequest,
                    "response contained no choices",
                )
            })
    }

    async fn rank(&self, proposals: &[Proposal]) -> CollabResult<Vec<ScoredProposal>> {
        let listing = proposals
            .iter()
            .map(|p| format!("- {}: {}", p.title, p.description))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Score each project idea from 0 to 1 by usefulness and feasibility.\n\
             Reply with a JSON array of objects with \"title\" and \"score\".\n\n{listing}"
        );

        let text = self.generate(&prompt).await?;
        let scores: Vec<ScoreEntry> = parse_json_array(&text)?;
        Ok(apply_scores(proposals, &scores))
    }
}

/// Extracts and decodes the first JSON array in a model reply.
pub(crate) fn parse_json_array<T: serde::de::DeserializeOwned>(text: &str) -> CollabResult<Vec<T>> {
    let unparseable = |detail: String| {
        CollaboratorError::permanent(
            SERVICE,
            PermanentKind::InvalidRequest,
            format!("reply is not a JSON array: {detail}"),
        )
    };

    let start = text.find('[').ok_or_else(|| unparseable("no '['".to_string()))?;
    let end = text.rfind(']').ok_or_else(|| unparseable("no ']'".to_string()))?;
    if end <= start {
        return Err(unparseable("brackets out of order".to_string()));
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| unparseable(e.to_string()))
}

/// Joins model scores back onto the proposals by title. Proposals the model
/// skipped score zero.
fn apply_scores(proposals: &[Proposal], scores: &[ScoreEntry]) -> Vec<ScoredProposal> {
    proposals
        .iter()
        .map(|proposal| {
            let score = scores
                .iter()
                .find(|s| s.title.trim().eq_ignore_ascii_case(proposal.title.trim()))
                .map(|s| s.score)
                .filter(|s| s.is_finite())
                .unwrap_or(0.0);
            ScoredProposal {
                title: proposal.title.clone(),
                description: proposal.description.clone(),
                score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(title: &str) -> Proposal {
        Proposal {
            title: title.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_parse_array_inside_prose() {
        let reply = "Sure! Here you go:\n[{\"title\": \"weather-cli\", \"score\": 0.8}]\nEnjoy.";
        let parsed: Vec<ScoreEntry> = parse_json_array(reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "weather-cli");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_json_array::<ScoreEntry>("I cannot help with that").unwrap_err();
        assert_eq!(err.classification(), "invalid-request");
    }

    #[test]
    fn test_unscored_proposals_get_zero() {
        let scores = vec![ScoreEntry {
            title: "Weather-CLI ".to_string(),
            score: 0.9,
        }];
        let ranked = apply_scores(&[proposal("weather-cli"), proposal("log-lens")], &scores);
        assert_eq!(ranked[0].score, 0.9);
        assert_eq!(ranked[1].score, 0.0);
    }
}
