//! Idea generation and ranking.
//!
//! Proposals come from the text generator, optionally seeded with trending
//! headlines, and are scored by the same collaborator. The ranked batch is
//! stored with today's date; a batch already stored for the date is reused.

use std::{sync::Arc, time::Duration};

use jiff::civil::Date;
use serde::Deserialize;

use crate::{
    collaborators::{groq::parse_json_array, with_timeout, CollabResult, TextGenerator, TrendSource},
    config::Config,
    error::{CollaboratorError, PermanentKind, Result},
    models::{Idea, Proposal, ScoredProposal},
    retry::RetryPolicy,
    store::StateStore,
};

const SERVICE: &str = "text-generator";

/// Headlines fetched to seed a generation prompt.
const HEADLINE_COUNT: usize = 10;

pub struct IdeaRanker {
    store: StateStore,
    generator: Option<Arc<dyn TextGenerator>>,
    trends: Option<Arc<dyn TrendSource>>,
    retry: RetryPolicy,
    call_timeout: Duration,
    batch_size: usize,
}

#[derive(Debug, Deserialize)]
struct RawProposal {
    title: String,
    #[serde(default)]
    description: String,
}

/// Orders proposals best first. Equal scores keep their input order.
pub fn rank_order(mut proposals: Vec<ScoredProposal>) -> Vec<ScoredProposal> {
    proposals.sort_by(|a, b| b.score.total_cmp(&a.score));
    proposals
}

impl IdeaRanker {
    pub fn new(
        store: StateStore,
        generator: Option<Arc<dyn TextGenerator>>,
        trends: Option<Arc<dyn TrendSource>>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            generator,
            trends,
            retry: RetryPolicy::from(&config.retry),
            call_timeout: config.call_timeout(),
            batch_size: config.ideas_per_batch.max(1) as usize,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn generator(&self) -> CollabResult<&Arc<dyn TextGenerator>> {
        self.generator.as_ref().ok_or_else(|| {
            CollaboratorError::permanent(
                SERVICE,
                PermanentKind::NotConfigured,
                "no text generator configured",
            )
        })
    }

    /// Generates, ranks and stores a batch for `date`. If the latest batch
    /// already carries `date` it is returned without any collaborator call.
    pub async fn generate(&self, date: Date) -> Result<Vec<Idea>> {
        let latest = self.store.latest_ideas().await?;
        if latest.first().is_some_and(|idea| idea.batch_date == date) {
            log::info!("Ideas for {date} already generated");
            return Ok(latest);
        }

        let headlines = self.headlines().await;
        let proposals = self.propose(&headlines).await?;
        let ranked = self.rank(&proposals).await?;

        let ideas = self.store.save_ideas(date, ranked).await?;
        log::info!("Stored {} ranked idea(s) for {date}", ideas.len());
        Ok(ideas)
    }

    /// Scores `proposals` and returns them best first.
    pub async fn rank(&self, proposals: &[Proposal]) -> Result<Vec<ScoredProposal>> {
        if proposals.is_empty() {
            return Ok(Vec::new());
        }
        let generator = self.generator()?;
        let scored = self
            .retry
            .run("rank ideas", || {
                with_timeout(SERVICE, self.call_timeout, generator.rank(proposals))
            })
            .await
            .result?;
        Ok(rank_order(scored))
    }

    /// Best effort: a failing trend source only loses the seeding.
    async fn headlines(&self) -> Vec<String> {
        let Some(trends) = &self.trends else {
            return Vec::new();
        };
        match with_timeout("trends", self.call_timeout, trends.headlines(HEADLINE_COUNT)).await {
            Ok(headlines) => headlines,
            Err(e) => {
                log::warn!("Could not fetch trending headlines: {e}");
                Vec::new()
            }
        }
    }

    async fn propose(&self, headlines: &[String]) -> Result<Vec<Proposal>> {
        let generator = self.generator()?;
        let prompt = self.prompt(headlines);
        let text = self
            .retry
            .run("generate ideas", || {
                with_timeout(SERVICE, self.call_timeout, generator.generate(&prompt))
            })
            .await
            .result?;

        let raw: Vec<RawProposal> = parse_json_array(&text)?;
        let proposals: Vec<Proposal> = raw
            .into_iter()
            .filter(|p| !p.title.trim().is_empty())
            .take(self.batch_size)
            .map(|p| Proposal {
                title: p.title.trim().to_string(),
                description: p.description.trim().to_string(),
            })
            .collect();

        if proposals.is_empty() {
            return Err(CollaboratorError::permanent(
                SERVICE,
                PermanentKind::InvalidRequest,
                "generator returned no usable proposals",
            )
            .into());
        }
        Ok(proposals)
    }

    fn prompt(&self, headlines: &[String]) -> String {
        let mut prompt = format!(
            "Propose {} small open-source developer tools worth building. \
             Reply with a JSON array of objects with \"title\" and \"description\".",
            self.batch_size
        );
        if !headlines.is_empty() {
            prompt.push_str("\n\nCurrent trending topics for inspiration:\n");
            for headline in headlines {
                prompt.push_str("- ");
                prompt.push_str(headline);
                prompt.push('\n');
            }
        }
        prompt
    }
}
