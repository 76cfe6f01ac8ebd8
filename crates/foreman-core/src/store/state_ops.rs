//! Organization state, one-time flags and repository registry operations.

use super::StateStore;
use crate::{
    error::Result,
    models::{OrgState, Repository},
};

impl StateStore {
    /// Loads the current state. A store that never persisted anything yields
    /// a zeroed state.
    pub async fn load(&self) -> Result<OrgState> {
        self.with_database(|db| db.load_state()).await
    }

    /// Persists the full state atomically and returns the saved snapshot.
    pub async fn save(&self, state: &OrgState) -> Result<OrgState> {
        let state = state.clone();
        self.with_database(move |db| db.save_state(&state)).await
    }

    /// Applies `mutate` as a single read-modify-write.
    pub async fn update<F>(&self, mutate: F) -> Result<OrgState>
    where
        F: FnOnce(&mut OrgState) + Send + 'static,
    {
        self.with_database(move |db| db.update_state(mutate)).await
    }

    /// Claims `key`. Returns `true` exactly once per key for the lifetime of
    /// the store, even across restarts and concurrent callers.
    pub async fn mark_one_time(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.with_database(move |db| db.claim_flag(&key)).await
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.with_database(|db| db.list_repositories()).await
    }

    /// Registers or refreshes repositories, keeping existing idea links.
    pub async fn upsert_repositories(&self, repositories: Vec<Repository>) -> Result<()> {
        self.with_database(move |db| db.sync_repositories(&repositories))
            .await
    }
}
