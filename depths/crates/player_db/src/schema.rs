use rusqlite::Connection;

use crate::error::PlayerDbError;

pub fn create_tables(conn: &Connection) -> Result<(), PlayerDbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            last_login    TEXT
        );

        CREATE TABLE IF NOT EXISTS characters (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id  INTEGER NOT NULL REFERENCES accounts(id),
            name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
            level       INTEGER NOT NULL DEFAULT 1,
            state       TEXT NOT NULL DEFAULT '{}',
            room_id     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            last_played TEXT
        );

        CREATE INDEX IF NOT EXISTS characters_by_account ON characters(account_id);
        ",
    )?;
    Ok(())
}
