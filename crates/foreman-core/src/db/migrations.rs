//! Database schema initialization and migrations.

use crate::error::{DatabaseResultExt, Result};

impl super::Database {
    /// Initializes the database schema using the embedded SQL file.
    pub(super) fn initialize_schema(&self) -> Result<()> {
        self.connection
            .execute("PRAGMA foreign_keys = ON", [])
            .db_context("Failed to enable foreign keys")?;

        let schema_sql = include_str!("../../assets/schema.sql");
        self.connection
            .execute_batch(schema_sql)
            .db_context("Failed to initialize database schema")?;

        self.apply_migrations()?;

        Ok(())
    }

    /// Apply database migrations for existing databases
    fn apply_migrations(&self) -> Result<()> {
        // Databases created before attempt tracking lack the column
        self.ensure_column("plan_entries", "attempts", "INTEGER NOT NULL DEFAULT 0")?;

        // Entry claims arrived after attempt tracking
        self.ensure_column("plan_entries", "claimed_by", "TEXT")?;
        self.ensure_column("plan_entries", "claim_expires_at_ms", "INTEGER")?;

        Ok(())
    }

    fn ensure_column(&self, table: &str, column: &str, definition: &str) -> Result<()> {
        let has_column: bool = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
                [table, column],
                |row| row.get(0),
            )
            .map(|count: i64| count > 0)
            .db_context(&format!("Failed to inspect {table} columns"))?;

        if !has_column {
            self.connection
                .execute(
                    &format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
                    [],
                )
                .db_context(&format!("Failed to add {column} column to {table} table"))?;
        }

        Ok(())
    }
}
