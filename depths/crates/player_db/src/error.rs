use thiserror::Error;

/// Failures of the account and character store.
#[derive(Debug, Error)]
pub enum PlayerDbError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),

    /// The stored JSON blob no longer matches the character shape.
    #[error("corrupt character state: {0}")]
    State(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("no account named {0}")]
    AccountNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("character name already taken: {0}")]
    CharacterNameTaken(String),

    #[error("no character with id {0}")]
    CharacterNotFound(i64),
}
