//! The persistence collaborator seen from the game side.

use std::path::Path;
use std::sync::{Arc, Mutex};

use player_db::{PlayerDb, PlayerDbError};
use thiserror::Error;

use crate::character::CharacterState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub id: i64,
    pub name: String,
    pub level: u32,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("that account already exists")]
    AccountExists,

    #[error("the name '{0}' is already taken")]
    NameTaken(String),

    #[error("character {0} not found")]
    CharacterNotFound(i64),

    #[error("saved character is unreadable: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Backend(String),
}

impl From<PlayerDbError> for StoreError {
    fn from(err: PlayerDbError) -> Self {
        match err {
            PlayerDbError::AccountNotFound(_) | PlayerDbError::InvalidPassword => {
                StoreError::InvalidCredentials
            }
            PlayerDbError::AccountExists(_) => StoreError::AccountExists,
            PlayerDbError::CharacterNameTaken(name) => StoreError::NameTaken(name),
            PlayerDbError::CharacterNotFound(id) => StoreError::CharacterNotFound(id),
            PlayerDbError::State(e) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Save and load of accounts and full character state. Calls block; async
/// callers go through [`blocking`].
pub trait PlayerStore: Send + Sync {
    fn account_exists(&self, username: &str) -> Result<bool, StoreError>;
    fn create_account(&self, username: &str, password: &str) -> Result<AccountRef, StoreError>;
    fn authenticate(&self, username: &str, password: &str) -> Result<AccountRef, StoreError>;
    fn list_characters(&self, account_id: i64) -> Result<Vec<CharacterSummary>, StoreError>;
    fn create_character(&self, account_id: i64, state: &CharacterState) -> Result<i64, StoreError>;
    fn load_character(&self, character_id: i64) -> Result<CharacterState, StoreError>;
    fn save_character(&self, character_id: i64, state: &CharacterState) -> Result<(), StoreError>;
}

/// Run a store call on the blocking pool.
pub async fn blocking<T, F>(store: &Arc<dyn PlayerStore>, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PlayerStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {}", e)))?
}

/// [`PlayerStore`] over the SQLite player database.
pub struct SqliteStore {
    db: Mutex<PlayerDb>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            db: Mutex::new(PlayerDb::open(path)?),
        })
    }

    pub fn open_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: Mutex::new(PlayerDb::open_memory()?),
        })
    }

    fn with_db<T>(&self, f: impl FnOnce(&PlayerDb) -> Result<T, PlayerDbError>) -> Result<T, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        f(&db).map_err(StoreError::from)
    }
}

impl PlayerStore for SqliteStore {
    fn account_exists(&self, username: &str) -> Result<bool, StoreError> {
        self.with_db(|db| Ok(db.account().get_by_username(username)?.is_some()))
    }

    fn create_account(&self, username: &str, password: &str) -> Result<AccountRef, StoreError> {
        let account = self.with_db(|db| db.account().create(username, password))?;
        Ok(AccountRef {
            id: account.id,
            username: account.username,
        })
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<AccountRef, StoreError> {
        let account = self.with_db(|db| db.account().authenticate(username, password))?;
        Ok(AccountRef {
            id: account.id,
            username: account.username,
        })
    }

    fn list_characters(&self, account_id: i64) -> Result<Vec<CharacterSummary>, StoreError> {
        let records = self.with_db(|db| db.character().list_for_account(account_id))?;
        Ok(records
            .into_iter()
            .map(|r| CharacterSummary {
                id: r.id,
                name: r.name,
                level: r.level,
            })
            .collect())
    }

    fn create_character(&self, account_id: i64, state: &CharacterState) -> Result<i64, StoreError> {
        let value = serde_json::to_value(state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let record = self.with_db(|db| {
            db.character()
                .create(account_id, &state.name, state.level, &value, &state.room_id)
        })?;
        Ok(record.id)
    }

    fn load_character(&self, character_id: i64) -> Result<CharacterState, StoreError> {
        let record = self.with_db(|db| db.character().load(character_id))?;
        let mut state: CharacterState =
            serde_json::from_value(record.state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        // The row's columns are authoritative for name and position.
        state.name = record.name;
        if let Some(room_id) = record.room_id {
            state.room_id = room_id;
        }
        Ok(state)
    }

    fn save_character(&self, character_id: i64, state: &CharacterState) -> Result<(), StoreError> {
        let value = serde_json::to_value(state).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.with_db(|db| {
            db.character()
                .save_state(character_id, state.level, &value, &state.room_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(!store.account_exists("Ayla").unwrap());
        let created = store.create_account("Ayla", "secret").unwrap();
        assert!(store.account_exists("Ayla").unwrap());

        let authed = store.authenticate("Ayla", "secret").unwrap();
        assert_eq!(authed, created);
        assert!(matches!(
            store.authenticate("Ayla", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("Nobody", "x"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn character_state_persists() {
        let store = SqliteStore::open_memory().unwrap();
        let account = store.create_account("Ayla", "secret").unwrap();

        let mut state = CharacterState::new("Ayla", "town_square");
        let id = store.create_character(account.id, &state).unwrap();

        state.room_id = "crypt".into();
        state.inventory.push("torch".into());
        state.gain_experience(150);
        store.save_character(id, &state).unwrap();

        let loaded = store.load_character(id).unwrap();
        assert_eq!(loaded, state);

        let list = store.list_characters(account.id).unwrap();
        assert_eq!(
            list,
            vec![CharacterSummary {
                id,
                name: "Ayla".into(),
                level: 2
            }]
        );
    }

    #[test]
    fn duplicate_character_name_is_reported() {
        let store = SqliteStore::open_memory().unwrap();
        let account = store.create_account("Ayla", "secret").unwrap();
        store
            .create_character(account.id, &CharacterState::new("Bram", "x"))
            .unwrap();
        let err = store
            .create_character(account.id, &CharacterState::new("Bram", "x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NameTaken(name) if name == "Bram"));
    }

    #[test]
    fn missing_character_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(matches!(
            store.save_character(99, &CharacterState::new("X", "y")),
            Err(StoreError::CharacterNotFound(99))
        ));
    }

    #[tokio::test]
    async fn blocking_runs_on_the_pool() {
        let store: Arc<dyn PlayerStore> = Arc::new(SqliteStore::open_memory().unwrap());
        let account = blocking(&store, |s| s.create_account("Pool", "pw")).await.unwrap();
        let exists = blocking(&store, |s| s.account_exists("Pool")).await.unwrap();
        assert!(exists);
        assert_eq!(account.username, "Pool");
    }
}
