//! Builder for creating and configuring StateStore instances.

use std::path::{Path, PathBuf};

use tokio::task;

use super::StateStore;
use crate::{
    db::Database,
    error::{ForemanError, Result},
};

/// Builder for creating and configuring StateStore instances.
#[derive(Debug, Clone, Default)]
pub struct StateStoreBuilder {
    database_path: Option<PathBuf>,
}

impl StateStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/foreman/foreman.db` or `~/.local/share/foreman/foreman.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Builds the store, creating the database file and schema if needed.
    ///
    /// # Errors
    ///
    /// Returns `ForemanError::FileSystem` if the database directory cannot be created
    /// Returns `ForemanError::Database` if database initialization fails
    pub async fn build(self) -> Result<StateStore> {
        let db_path = match self.database_path {
            Some(path) => path,
            None => Self::default_database_path()?,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ForemanError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), ForemanError>(())
        })
        .await
        .map_err(ForemanError::join)??;

        log::debug!("State store ready at {}", db_path.display());
        Ok(StateStore::new(db_path))
    }

    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("foreman")
            .place_data_file("foreman.db")
            .map_err(|e| ForemanError::XdgDirectory(e.to_string()))
    }
}
