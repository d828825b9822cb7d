mod schema;

use std::path::Path;

use rusqlite::{Connection, Result};

use schema::{FALLBACK_NOTEBOOK, INITIAL_SCHEMA};

/// Database wrapper providing connection management and schema initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Creates tables and indexes, then makes sure the fallback notebook
    /// exists. Safe to run against an existing database.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        self.conn.execute_batch(FALLBACK_NOTEBOOK)?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
