//! Persistence layer backed by redb.
//!
//! One table per entity, JSON-encoded values keyed by id. Typed wrappers
//! expose the operations the API layer needs; owner scoping lives here so
//! handlers cannot forget it.

pub mod chat;
pub mod user;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use chat::ChatStorage;
pub use user::UserStorage;

/// Central storage manager that initializes all tables.
pub struct Storage {
    pub users: UserStorage,
    pub chats: ChatStorage,
}

impl Storage {
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        Ok(Self {
            users: UserStorage::new(db.clone())?,
            chats: ChatStorage::new(db)?,
        })
    }
}
