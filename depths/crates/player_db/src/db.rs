use std::path::Path;

use rusqlite::Connection;

use crate::account::AccountRepo;
use crate::character::CharacterRepo;
use crate::error::PlayerDbError;
use crate::schema;

/// Main database handle wrapping a SQLite connection.
pub struct PlayerDb {
    conn: Connection,
}

impl PlayerDb {
    /// Open (or create) a database at the given file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlayerDbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        schema::create_tables(&conn)?;
        tracing::debug!(path = %path.display(), "player database ready");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, PlayerDbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn account(&self) -> AccountRepo<'_> {
        AccountRepo::new(&self.conn)
    }

    pub fn character(&self) -> CharacterRepo<'_> {
        CharacterRepo::new(&self.conn)
    }
}
