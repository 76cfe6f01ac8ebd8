//! Daily plan persistence: insert-once, read, status advance, entry resolution.

use std::time::Duration;

use jiff::{civil::Date, Timestamp};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    state_queries::{read_state, upsert_repository, write_state},
    utils::{parse_date, parse_enum, parse_timestamp, read_error},
};
use crate::{
    error::{DatabaseResultExt, ForemanError, Result},
    models::{
        ActionKind, ActionRecord, DailyPlan, EntryError, EntryStatus, PlanEntry, PlanStatus,
        Repository,
    },
};

const SELECT_PLAN_SQL: &str =
    "SELECT plan_date, status, created_at, updated_at FROM daily_plans WHERE plan_date = ?1";
const SELECT_PLAN_DATES_SQL: &str =
    "SELECT plan_date FROM daily_plans ORDER BY plan_date DESC LIMIT ?1";
const INSERT_PLAN_SQL: &str = "INSERT OR IGNORE INTO daily_plans (plan_date, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)";
const SELECT_ENTRIES_SQL: &str = "SELECT position, idea_id, kind, target, instruction, status, reference, error_class, error_message, attempts, resolved_at FROM plan_entries WHERE plan_date = ?1 ORDER BY position";
const INSERT_ENTRY_SQL: &str = "INSERT INTO plan_entries (plan_date, position, idea_id, kind, target, instruction, status, attempts) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)";
const UPDATE_PLAN_STATUS_SQL: &str =
    "UPDATE daily_plans SET status = ?1, updated_at = ?2 WHERE plan_date = ?3";
const RESOLVE_ENTRY_SQL: &str = "UPDATE plan_entries SET status = ?1, reference = ?2, error_class = ?3, error_message = ?4, attempts = ?5, resolved_at = ?6,
     claimed_by = NULL, claim_expires_at_ms = NULL
     WHERE plan_date = ?7 AND position = ?8 AND status = 'pending'";
const CLAIM_ENTRY_SQL: &str = "UPDATE plan_entries SET claimed_by = ?1, claim_expires_at_ms = ?2
     WHERE plan_date = ?3 AND position = ?4 AND status = 'pending'
       AND (claimed_by IS NULL OR claimed_by = ?1 OR claim_expires_at_ms IS NULL OR claim_expires_at_ms <= ?5)";
const RELEASE_ENTRY_SQL: &str = "UPDATE plan_entries SET claimed_by = NULL, claim_expires_at_ms = NULL
     WHERE plan_date = ?1 AND position = ?2 AND claimed_by = ?3 AND status = 'pending'";

/// Terminal outcome of one entry, written together with its state effects.
#[derive(Debug, Clone)]
pub struct EntryResolution {
    pub position: u32,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub error: Option<EntryError>,
    pub attempts: u32,
}

fn read_plan(conn: &Connection, date: Date) -> Result<Option<DailyPlan>> {
    let header = conn
        .query_row(SELECT_PLAN_SQL, params![date.to_string()], |row| {
            Ok((
                parse_date(0, &row.get::<_, String>(0)?)?,
                parse_enum::<PlanStatus>(1, &row.get::<_, String>(1)?)?,
                parse_timestamp(2, &row.get::<_, String>(2)?)?,
                parse_timestamp(3, &row.get::<_, String>(3)?)?,
            ))
        })
        .optional()
        .map_err(read_error("daily_plans", "Failed to query plan"))?;

    let Some((date, status, created_at, updated_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(SELECT_ENTRIES_SQL)
        .db_context("Failed to prepare entry query")?;
    let entries = stmt
        .query_map(params![date.to_string()], build_entry_from_row)
        .map_err(read_error("plan_entries", "Failed to query plan entries"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(read_error("plan_entries", "Failed to fetch plan entries"))?;

    Ok(Some(DailyPlan {
        date,
        status,
        entries,
        created_at,
        updated_at,
    }))
}

fn build_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<PlanEntry> {
    let error_class: Option<String> = row.get(7)?;
    let error_message: Option<String> = row.get(8)?;
    let error = error_class.map(|classification| EntryError {
        classification,
        message: error_message.unwrap_or_default(),
    });

    Ok(PlanEntry {
        position: row.get::<_, i64>(0)? as u32,
        idea_id: row.get::<_, Option<i64>>(1)?.map(|id| id as u64),
        kind: parse_enum::<ActionKind>(2, &row.get::<_, String>(2)?)?,
        target: row.get(3)?,
        instruction: row.get(4)?,
        status: parse_enum::<EntryStatus>(5, &row.get::<_, String>(5)?)?,
        reference: row.get(6)?,
        error,
        attempts: row.get::<_, i64>(9)? as u32,
        resolved_at: row
            .get::<_, Option<String>>(10)?
            .map(|raw| parse_timestamp(10, &raw))
            .transpose()?,
    })
}

impl super::Database {
    /// Retrieves the plan for `date` with its entries in execution order.
    pub fn get_plan(&self, date: Date) -> Result<Option<DailyPlan>> {
        read_plan(&self.connection, date)
    }

    /// Lists the most recent plans, newest first.
    pub fn list_plans(&self, limit: u32) -> Result<Vec<DailyPlan>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_PLAN_DATES_SQL)
            .db_context("Failed to prepare plan listing")?;
        let dates = stmt
            .query_map(params![limit as i64], |row| {
                parse_date(0, &row.get::<_, String>(0)?)
            })
            .map_err(read_error("daily_plans", "Failed to list plans"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(read_error("daily_plans", "Failed to fetch plans"))?;

        dates
            .into_iter()
            .filter_map(|date| read_plan(&self.connection, date).transpose())
            .collect()
    }

    /// Persists `plan` unless a plan already exists for its date, in which
    /// case the stored plan is returned untouched.
    pub fn insert_plan_if_absent(&mut self, plan: &DailyPlan) -> Result<DailyPlan> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let date_str = plan.date.to_string();
        let inserted = tx
            .execute(
                INSERT_PLAN_SQL,
                params![
                    &date_str,
                    PlanStatus::Planned.as_str(),
                    plan.created_at.to_string(),
                    plan.updated_at.to_string()
                ],
            )
            .db_context("Failed to insert plan")?;

        if inserted == 0 {
            let existing = read_plan(&tx, plan.date)?
                .ok_or(ForemanError::PlanNotFound { date: plan.date })?;
            tx.commit().db_context("Failed to commit transaction")?;
            return Ok(existing);
        }

        for entry in &plan.entries {
            tx.execute(
                INSERT_ENTRY_SQL,
                params![
                    &date_str,
                    entry.position as i64,
                    entry.idea_id.map(|id| id as i64),
                    entry.kind.as_str(),
                    &entry.target,
                    &entry.instruction,
                    EntryStatus::Pending.as_str()
                ],
            )
            .db_context("Failed to insert plan entry")?;
        }

        let stored = read_plan(&tx, plan.date)?.ok_or(ForemanError::PlanNotFound { date: plan.date })?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(stored)
    }

    /// Moves the plan forward to `next`. Backward or repeated transitions are
    /// ignored; the stored status is returned either way.
    pub fn advance_plan_status(&mut self, date: Date, next: PlanStatus) -> Result<PlanStatus> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let current = read_plan(&tx, date)?
            .ok_or(ForemanError::PlanNotFound { date })?
            .status;

        if !current.can_advance_to(next) {
            tx.commit().db_context("Failed to commit transaction")?;
            return Ok(current);
        }

        tx.execute(
            UPDATE_PLAN_STATUS_SQL,
            params![next.as_str(), Timestamp::now().to_string(), date.to_string()],
        )
        .db_context("Failed to update plan status")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(next)
    }

    /// Takes the execution claim on a pending entry for `owner` until `lease`
    /// runs out.
    ///
    /// Returns `false` when the entry is no longer pending or another owner
    /// holds an unexpired claim. A claim left behind by a crashed process is
    /// taken over once its lease has expired.
    pub fn claim_entry(
        &mut self,
        date: Date,
        position: u32,
        owner: &str,
        lease: Duration,
    ) -> Result<bool> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let now_ms = Timestamp::now().as_millisecond();
        let lease_ms = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);
        let claimed = tx
            .execute(
                CLAIM_ENTRY_SQL,
                params![
                    owner,
                    now_ms.saturating_add(lease_ms),
                    date.to_string(),
                    position as i64,
                    now_ms
                ],
            )
            .db_context("Failed to claim plan entry")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(claimed > 0)
    }

    /// Drops `owner`'s claim on a still pending entry so another pass can
    /// pick it up right away.
    pub fn release_entry(&mut self, date: Date, position: u32, owner: &str) -> Result<()> {
        self.connection
            .execute(
                RELEASE_ENTRY_SQL,
                params![date.to_string(), position as i64, owner],
            )
            .db_context("Failed to release plan entry")?;
        Ok(())
    }

    /// Records an entry's terminal outcome and its effect on the organization
    /// state in one transaction.
    ///
    /// Returns `false` without touching anything when the entry was no longer
    /// pending, so a resolution is never counted twice.
    pub fn resolve_entry(
        &mut self,
        date: Date,
        resolution: &EntryResolution,
        recent_limit: usize,
    ) -> Result<bool> {
        if resolution.status == EntryStatus::Pending {
            return Err(ForemanError::invalid_input("status")
                .with_reason("An entry can only be resolved to a terminal status"));
        }

        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let plan = read_plan(&tx, date)?.ok_or(ForemanError::PlanNotFound { date })?;
        let entry = plan
            .entries
            .iter()
            .find(|entry| entry.position == resolution.position)
            .ok_or_else(|| {
                ForemanError::invalid_input("position").with_reason(format!(
                    "Plan {date} has no entry at position {}",
                    resolution.position
                ))
            })?;

        let now = Timestamp::now();
        let updated = tx
            .execute(
                RESOLVE_ENTRY_SQL,
                params![
                    resolution.status.as_str(),
                    resolution.reference.as_deref(),
                    resolution.error.as_ref().map(|e| e.classification.as_str()),
                    resolution.error.as_ref().map(|e| e.message.as_str()),
                    resolution.attempts as i64,
                    now.to_string(),
                    date.to_string(),
                    resolution.position as i64
                ],
            )
            .db_context("Failed to resolve plan entry")?;

        if updated == 0 {
            tx.commit().db_context("Failed to commit transaction")?;
            return Ok(false);
        }

        let mut state = read_state(&tx)?;
        if resolution.status == EntryStatus::Succeeded {
            state.count_success(entry.kind);
            if entry.kind == ActionKind::CreateRepository {
                upsert_repository(
                    &tx,
                    &Repository {
                        name: entry.target.clone(),
                        idea_id: entry.idea_id,
                        url: resolution.reference.clone(),
                        created_at: now,
                    },
                )?;
            }
        }
        state.push_action(
            ActionRecord {
                plan_date: date,
                kind: entry.kind,
                target: entry.target.clone(),
                status: resolution.status,
                reference: resolution.reference.clone(),
                at: now,
            },
            recent_limit,
        );
        write_state(&tx, &state)?;

        tx.execute(
            UPDATE_PLAN_STATUS_SQL,
            params![plan.status.as_str(), now.to_string(), date.to_string()],
        )
        .db_context("Failed to touch plan timestamp")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(true)
    }
}
