//! Ranked idea batches.

use jiff::{civil::Date, Timestamp};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    state_queries::{read_state, write_state},
    utils::{parse_date, parse_timestamp, read_error},
};
use crate::{
    error::{DatabaseResultExt, Result},
    models::{Idea, ScoredProposal},
};

const NEXT_BATCH_SQL: &str = "SELECT COALESCE(MAX(batch), 0) + 1 FROM ideas";
const INSERT_IDEA_SQL: &str = "INSERT INTO ideas (batch, title, description, score, rank, batch_date, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const SELECT_IDEA_COLUMNS: &str = "SELECT id, title, description, score, rank, batch_date, created_at FROM ideas";

fn build_idea_from_row(row: &rusqlite::Row) -> rusqlite::Result<Idea> {
    Ok(Idea {
        id: row.get::<_, i64>(0)? as u64,
        title: row.get(1)?,
        description: row.get(2)?,
        score: row.get(3)?,
        rank: row.get::<_, i64>(4)? as u32,
        batch_date: parse_date(5, &row.get::<_, String>(5)?)?,
        created_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
    })
}

fn select_batch(conn: &Connection, batch: i64) -> Result<Vec<Idea>> {
    let sql = format!("{SELECT_IDEA_COLUMNS} WHERE batch = ?1 ORDER BY rank");
    let mut stmt = conn
        .prepare(&sql)
        .db_context("Failed to prepare idea query")?;
    let ideas = stmt
        .query_map(params![batch], build_idea_from_row)
        .map_err(read_error("ideas", "Failed to query ideas"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(read_error("ideas", "Failed to fetch ideas"))?;
    Ok(ideas)
}

impl super::Database {
    /// Stores an already ranked batch, preserving the given order as rank.
    ///
    /// The batch and the `ideas_processed` counter are committed together.
    pub fn save_ideas(&mut self, batch_date: Date, ranked: &[ScoredProposal]) -> Result<Vec<Idea>> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let batch: i64 = tx
            .query_row(NEXT_BATCH_SQL, [], |row| row.get(0))
            .db_context("Failed to allocate idea batch")?;

        let created_at = Timestamp::now().to_string();
        for (rank, proposal) in ranked.iter().enumerate() {
            tx.execute(
                INSERT_IDEA_SQL,
                params![
                    batch,
                    &proposal.title,
                    &proposal.description,
                    proposal.score,
                    rank as i64,
                    batch_date.to_string(),
                    &created_at
                ],
            )
            .db_context("Failed to insert idea")?;
        }

        let mut state = read_state(&tx)?;
        state.counters.ideas_processed += ranked.len() as u64;
        write_state(&tx, &state)?;

        let ideas = select_batch(&tx, batch)?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(ideas)
    }

    /// Returns the most recently ranked batch in rank order.
    pub fn latest_ideas(&self) -> Result<Vec<Idea>> {
        let batch: Option<i64> = self
            .connection
            .query_row("SELECT MAX(batch) FROM ideas", [], |row| row.get(0))
            .db_context("Failed to query latest idea batch")?;

        match batch {
            Some(batch) => select_batch(&self.connection, batch),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_idea(&self, id: u64) -> Result<Option<Idea>> {
        let sql = format!("{SELECT_IDEA_COLUMNS} WHERE id = ?1");
        self.connection
            .query_row(&sql, params![id as i64], build_idea_from_row)
            .optional()
            .map_err(read_error("ideas", "Failed to query idea"))
    }
}
