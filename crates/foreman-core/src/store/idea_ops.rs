//! Idea batch operations.

use jiff::civil::Date;

use super::StateStore;
use crate::{
    error::Result,
    models::{Idea, ScoredProposal},
};

impl StateStore {
    /// Stores a ranked batch; list order becomes rank order.
    pub async fn save_ideas(&self, batch_date: Date, ranked: Vec<ScoredProposal>) -> Result<Vec<Idea>> {
        self.with_database(move |db| db.save_ideas(batch_date, &ranked))
            .await
    }

    /// The most recent ranked batch, best first.
    pub async fn latest_ideas(&self) -> Result<Vec<Idea>> {
        self.with_database(|db| db.latest_ideas()).await
    }

    pub async fn get_idea(&self, id: u64) -> Result<Option<Idea>> {
        self.with_database(move |db| db.get_idea(id)).await
    }
}
