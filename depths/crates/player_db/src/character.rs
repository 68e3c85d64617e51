use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::error::PlayerDbError;

const SELECT_COLUMNS: &str =
    "SELECT id, account_id, name, level, state, room_id, created_at, last_played FROM characters";

/// A character row. `state` is the game's own serialized character blob.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub level: u32,
    pub state: Value,
    pub room_id: Option<String>,
    pub created_at: String,
    pub last_played: Option<String>,
}

impl CharacterRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(Self, String)> {
        Ok((
            Self {
                id: row.get(0)?,
                account_id: row.get(1)?,
                name: row.get(2)?,
                level: row.get(3)?,
                state: Value::Null,
                room_id: row.get(5)?,
                created_at: row.get(6)?,
                last_played: row.get(7)?,
            },
            row.get(4)?,
        ))
    }

    fn with_state(row: (Self, String)) -> Result<Self, PlayerDbError> {
        let (mut record, json) = row;
        record.state = serde_json::from_str(&json)?;
        Ok(record)
    }
}

pub struct CharacterRepo<'a> {
    conn: &'a Connection,
}

impl<'a> CharacterRepo<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(
        &self,
        account_id: i64,
        name: &str,
        level: u32,
        state: &Value,
        room_id: &str,
    ) -> Result<CharacterRecord, PlayerDbError> {
        if self.get_by_name(name)?.is_some() {
            return Err(PlayerDbError::CharacterNameTaken(name.to_string()));
        }

        let state_json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO characters (account_id, name, level, state, room_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![account_id, name, level, state_json, room_id],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(account_id, character_id = id, name, "character created");

        Ok(CharacterRecord {
            id,
            account_id,
            name: name.to_string(),
            level,
            state: state.clone(),
            room_id: Some(room_id.to_string()),
            created_at: String::new(),
            last_played: None,
        })
    }

    pub fn list_for_account(&self, account_id: i64) -> Result<Vec<CharacterRecord>, PlayerDbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE account_id = ?1 ORDER BY id", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map(rusqlite::params![account_id], CharacterRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(CharacterRecord::with_state).collect()
    }

    pub fn load(&self, id: i64) -> Result<CharacterRecord, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                rusqlite::params![id],
                CharacterRecord::from_row,
            )
            .optional()?
            .ok_or(PlayerDbError::CharacterNotFound(id))?;
        CharacterRecord::with_state(row)
    }

    /// Overwrite the saved state of a character and stamp `last_played`.
    pub fn save_state(
        &self,
        id: i64,
        level: u32,
        state: &Value,
        room_id: &str,
    ) -> Result<(), PlayerDbError> {
        let state_json = serde_json::to_string(state)?;
        let rows = self.conn.execute(
            "UPDATE characters SET level = ?1, state = ?2, room_id = ?3, last_played = datetime('now') WHERE id = ?4",
            rusqlite::params![level, state_json, room_id, id],
        )?;
        if rows == 0 {
            return Err(PlayerDbError::CharacterNotFound(id));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), PlayerDbError> {
        let rows = self
            .conn
            .execute("DELETE FROM characters WHERE id = ?1", rusqlite::params![id])?;
        if rows == 0 {
            return Err(PlayerDbError::CharacterNotFound(id));
        }
        Ok(())
    }

    /// Case-insensitive lookup by name.
    pub fn get_by_name(&self, name: &str) -> Result<Option<CharacterRecord>, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE name = ?1", SELECT_COLUMNS),
                rusqlite::params![name],
                CharacterRecord::from_row,
            )
            .optional()?;
        row.map(CharacterRecord::with_state).transpose()
    }
}
