//! Async access to the persistent state store.
//!
//! [`StateStore`] is the only owner of the organization state. It hands out
//! snapshots and applies mutations through the blocking [`Database`] layer on
//! tokio's blocking pool, one connection per operation.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Agent, CLI,  │───▶│  StateStore  │───▶│   Database   │
//! │ MCP server   │    │ (async, Arc) │    │  (rusqlite)  │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use foreman_core::StateStoreBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StateStoreBuilder::new()
//!     .with_database_path(Some("/tmp/foreman.db"))
//!     .build()
//!     .await?;
//!
//! if store.mark_one_time("startup_message").await? {
//!     println!("first start");
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tokio::task;

use crate::{
    db::Database,
    error::{ForemanError, Result},
};

pub mod builder;
pub mod idea_ops;
pub mod plan_ops;
pub mod state_ops;


pub use builder::StateStoreBuilder;

/// Handle to the persistent state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StateStore {
    pub(crate) db_path: PathBuf,
}

impl StateStore {
    pub(crate) fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    /// Location of the backing database file.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `op` against a fresh connection on the blocking pool.
    pub(crate) async fn with_database<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            op(&mut db)
        })
        .await
        .map_err(ForemanError::join)?
    }
}
