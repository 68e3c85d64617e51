//! SQLite-backed storage for accounts and characters.

pub mod account;
pub mod character;
pub mod db;
pub mod error;
mod schema;

pub use account::{Account, AccountRepo};
pub use character::{CharacterRecord, CharacterRepo};
pub use db::PlayerDb;
pub use error::PlayerDbError;
