mod budget;
mod expenses;
mod schema;

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Bring the schema up to date. Each pending step runs in its own
    /// transaction together with the `user_version` bump.
    fn migrate(&mut self) -> Result<()> {
        let from = self.user_version()?;
        if from > schema::CURRENT_VERSION {
            bail!(
                "Database schema v{from} is newer than this build supports (v{})",
                schema::CURRENT_VERSION
            );
        }
        for (step, sql) in schema::MIGRATIONS.iter().enumerate().skip(from as usize) {
            let to = step as i32 + 1;
            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)
                .with_context(|| format!("Schema step v{step} -> v{to} failed"))?;
            tx.pragma_update(None, "user_version", to)?;
            tx.commit()?;
            tracing::info!(from = step, to, "database schema updated");
        }
        Ok(())
    }

    fn user_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    #[cfg(test)]
    pub(crate) fn schema_version(&self) -> Result<i32> {
        self.user_version()
    }
}

/// Read a TEXT column holding a decimal amount.
fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}


#[cfg(test)]
#[path = "expenses_tests.rs"]
mod expenses_tests;
