use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::rand_core::OsRng;
use password_hash::SaltString;
use rusqlite::{Connection, OptionalExtension};

use crate::error::PlayerDbError;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

pub struct AccountRepo<'a> {
    conn: &'a Connection,
}

impl<'a> AccountRepo<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new account. Usernames are unique case-insensitively.
    pub fn create(&self, username: &str, password: &str) -> Result<Account, PlayerDbError> {
        if self.get_by_username(username)?.is_some() {
            return Err(PlayerDbError::AccountExists(username.to_string()));
        }

        let password_hash = hash_password(password)?;
        self.conn.execute(
            "INSERT INTO accounts (username, password_hash) VALUES (?1, ?2)",
            rusqlite::params![username, password_hash],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(account_id = id, username, "account created");

        Ok(Account {
            id,
            username: username.to_string(),
            created_at: String::new(),
            last_login: None,
        })
    }

    /// Verify credentials and stamp `last_login`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account, PlayerDbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, password_hash, created_at, last_login FROM accounts WHERE username = ?1",
                rusqlite::params![username],
                |row| {
                    Ok((
                        Account {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            created_at: row.get(3)?,
                            last_login: row.get(4)?,
                        },
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((account, password_hash)) = row else {
            return Err(PlayerDbError::AccountNotFound(username.to_string()));
        };
        verify_password(password, &password_hash)?;

        self.conn.execute(
            "UPDATE accounts SET last_login = datetime('now') WHERE id = ?1",
            rusqlite::params![account.id],
        )?;
        Ok(account)
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<Account>, PlayerDbError> {
        let account = self
            .conn
            .query_row(
                "SELECT id, username, created_at, last_login FROM accounts WHERE username = ?1",
                rusqlite::params![username],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(2)?,
                        last_login: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }
}

fn hash_password(password: &str) -> Result<String, PlayerDbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PlayerDbError::Hashing(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<(), PlayerDbError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PlayerDbError::Hashing(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PlayerDbError::InvalidPassword)
}
