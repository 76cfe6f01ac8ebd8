//! Organization state, one-time flags and repository registry queries.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

use super::utils::{parse_timestamp, read_error};
use crate::{
    error::{DatabaseResultExt, ForemanError, Result},
    models::{ActionRecord, OrgState, Repository},
};

const SELECT_STATE_SQL: &str = "SELECT ideas_processed, repositories_created, branches_opened, issues_opened, issues_closed, prs_merged, prs_open, recent_actions, updated_at FROM org_state WHERE id = 1";
const UPSERT_STATE_SQL: &str = "INSERT INTO org_state (id, ideas_processed, repositories_created, branches_opened, issues_opened, issues_closed, prs_merged, prs_open, recent_actions, updated_at)
     VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT(id) DO UPDATE SET
        ideas_processed = excluded.ideas_processed,
        repositories_created = excluded.repositories_created,
        branches_opened = excluded.branches_opened,
        issues_opened = excluded.issues_opened,
        issues_closed = excluded.issues_closed,
        prs_merged = excluded.prs_merged,
        prs_open = excluded.prs_open,
        recent_actions = excluded.recent_actions,
        updated_at = excluded.updated_at";
const SELECT_FLAGS_SQL: &str = "SELECT key FROM one_time_flags ORDER BY key";
const CLAIM_FLAG_SQL: &str = "INSERT OR IGNORE INTO one_time_flags (key, claimed_at) VALUES (?1, ?2)";
const SELECT_REPOSITORIES_SQL: &str =
    "SELECT name, idea_id, url, created_at FROM repositories ORDER BY name COLLATE NOCASE";
const UPSERT_REPOSITORY_SQL: &str = "INSERT INTO repositories (name, idea_id, url, created_at) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(name) DO UPDATE SET
        idea_id = COALESCE(repositories.idea_id, excluded.idea_id),
        url = COALESCE(excluded.url, repositories.url)";

/// Reads the state row plus claimed flags on the given connection.
///
/// A missing row yields a zeroed state; a malformed row is reported as
/// corruption rather than silently reset.
pub(crate) fn read_state(conn: &Connection) -> Result<OrgState> {
    let row = conn
        .query_row(SELECT_STATE_SQL, [], |row| {
            Ok((
                [
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ],
                row.get::<_, String>(7)?,
                parse_timestamp(8, &row.get::<_, String>(8)?)?,
            ))
        })
        .optional()
        .map_err(read_error("org_state", "Failed to query organization state"))?;

    let mut state = OrgState::default();
    if let Some((counts, recent_json, updated_at)) = row {
        let [ideas, repos, branches, opened, closed, merged, open] = counts;
        state.counters.ideas_processed = to_count(ideas)?;
        state.counters.repositories_created = to_count(repos)?;
        state.counters.branches_opened = to_count(branches)?;
        state.counters.issues_opened = to_count(opened)?;
        state.counters.issues_closed = to_count(closed)?;
        state.counters.prs_merged = to_count(merged)?;
        state.counters.prs_open = to_count(open)?;
        state.recent_actions = serde_json::from_str::<Vec<ActionRecord>>(&recent_json)
            .map_err(|e| ForemanError::corruption("org_state", e))?;
        state.updated_at = Some(updated_at);
    }

    let mut stmt = conn
        .prepare(SELECT_FLAGS_SQL)
        .db_context("Failed to prepare flag query")?;
    state.flags = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .db_context("Failed to query one-time flags")?
        .collect::<rusqlite::Result<_>>()
        .db_context("Failed to fetch one-time flags")?;

    Ok(state)
}

/// Writes the state row and any newly set flags on the given connection.
pub(crate) fn write_state(conn: &Connection, state: &OrgState) -> Result<Timestamp> {
    let now = Timestamp::now();
    let now_str = now.to_string();
    let recent_json = serde_json::to_string(&state.recent_actions)?;
    let c = &state.counters;

    conn.execute(
        UPSERT_STATE_SQL,
        params![
            c.ideas_processed as i64,
            c.repositories_created as i64,
            c.branches_opened as i64,
            c.issues_opened as i64,
            c.issues_closed as i64,
            c.prs_merged as i64,
            c.prs_open as i64,
            recent_json,
            &now_str
        ],
    )
    .db_context("Failed to write organization state")?;

    // Flags are claim-only; re-inserting an already claimed key is a no-op.
    for key in &state.flags {
        conn.execute(CLAIM_FLAG_SQL, params![key, &now_str])
            .db_context("Failed to write one-time flag")?;
    }

    Ok(now)
}

/// Registers a repository, keeping the first known idea link.
pub(crate) fn upsert_repository(conn: &Connection, repository: &Repository) -> Result<()> {
    conn.execute(
        UPSERT_REPOSITORY_SQL,
        params![
            &repository.name,
            repository.idea_id.map(|id| id as i64),
            repository.url.as_deref(),
            repository.created_at.to_string()
        ],
    )
    .db_context("Failed to upsert repository")?;
    Ok(())
}

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| ForemanError::corruption("org_state", format!("negative counter {value}")))
}

impl super::Database {
    /// Loads the organization state, zeroed when nothing was persisted yet.
    pub fn load_state(&self) -> Result<OrgState> {
        read_state(&self.connection)
    }

    /// Persists the full organization state atomically.
    pub fn save_state(&mut self, state: &OrgState) -> Result<OrgState> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let updated_at = write_state(&tx, state)?;

        tx.commit().db_context("Failed to commit transaction")?;

        let mut saved = state.clone();
        saved.updated_at = Some(updated_at);
        Ok(saved)
    }

    /// Applies `mutate` to the current state inside one transaction.
    ///
    /// The read and the write share the transaction, so concurrent writers
    /// cannot lose each other's updates.
    pub fn update_state<F>(&mut self, mutate: F) -> Result<OrgState>
    where
        F: FnOnce(&mut OrgState),
    {
        let tx = self
            .connection
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let mut state = read_state(&tx)?;
        mutate(&mut state);
        state.updated_at = Some(write_state(&tx, &state)?);

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(state)
    }

    /// Atomically claims a one-time key. Returns `true` only for the first
    /// claim of `key` over the lifetime of the database.
    pub fn claim_flag(&mut self, key: &str) -> Result<bool> {
        if key.trim().is_empty() {
            return Err(ForemanError::invalid_input("key").with_reason("Key must not be empty"));
        }

        let inserted = self
            .connection
            .execute(CLAIM_FLAG_SQL, params![key, Timestamp::now().to_string()])
            .db_context("Failed to claim one-time flag")?;

        Ok(inserted == 1)
    }

    /// Lists every known repository, ordered by name.
    pub fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_REPOSITORIES_SQL)
            .db_context("Failed to prepare repository query")?;

        let repositories = stmt
            .query_map([], |row| {
                Ok(Repository {
                    name: row.get(0)?,
                    idea_id: row.get::<_, Option<i64>>(1)?.map(|id| id as u64),
                    url: row.get(2)?,
                    created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
                })
            })
            .map_err(read_error("repositories", "Failed to query repositories"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(read_error("repositories", "Failed to fetch repositories"))?;

        Ok(repositories)
    }

    /// Registers repositories discovered on the source host.
    pub fn sync_repositories(&mut self, repositories: &[Repository]) -> Result<()> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        for repository in repositories {
            upsert_repository(&tx, repository)?;
        }

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(())
    }
}
