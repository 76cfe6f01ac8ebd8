//! Database operations and SQLite management for the agent's state.
//!
//! This module provides the low-level, blocking persistence layer. Every
//! multi-statement mutation runs inside a single transaction so that a crash
//! never leaves a half-applied update behind. Async callers go through
//! [`crate::store::StateStore`], which moves the work onto the blocking pool.

use std::{path::Path, time::Duration};

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub mod idea_queries;
pub mod migrations;
pub mod plan_queries;
pub mod state_queries;
mod utils;

/// How long a connection waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .db_context("Failed to configure busy timeout")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}
