//! Chat storage with owner scoping and optimistic concurrency.

use crate::models::{Chat, ChatSummary};
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const CHAT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chats");

/// How many chats the sidebar listing returns.
pub const RECENT_CHATS_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct ChatStorage {
    db: Arc<Database>,
}

impl ChatStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CHAT_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new chat (fails if the id already exists).
    pub fn create(&self, chat: &Chat) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHAT_TABLE)?;
            if table.get(chat.id.as_str())?.is_some() {
                return Err(anyhow::anyhow!("Chat {} already exists", chat.id));
            }
            let json_bytes = serde_json::to_vec(chat)?;
            table.insert(chat.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Chat>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_TABLE)?;

        if let Some(value) = table.get(id)? {
            let chat: Chat = serde_json::from_slice(value.value())?;
            Ok(Some(chat))
        } else {
            Ok(None)
        }
    }

    /// Get a chat only if it belongs to the given owner.
    pub fn find_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Chat>> {
        Ok(self.get(id)?.filter(|chat| chat.owner_id == owner_id))
    }

    /// Save a chat, checking its revision against the stored document.
    ///
    /// The caller holds the revision it loaded; if another save landed in
    /// between, the stored revision no longer matches and the write is
    /// rejected instead of silently overwriting. Bumps the revision on
    /// success.
    pub fn save(&self, chat: &mut Chat) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHAT_TABLE)?;

            if let Some(value) = table.get(chat.id.as_str())? {
                let stored: Chat = serde_json::from_slice(value.value())?;
                if stored.revision != chat.revision {
                    return Err(anyhow::anyhow!(
                        "Chat {} was modified concurrently (stored revision {}, expected {})",
                        chat.id,
                        stored.revision,
                        chat.revision
                    ));
                }
            }

            chat.revision += 1;
            let json_bytes = serde_json::to_vec(chat)?;
            table.insert(chat.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recently updated chats for a user, newest first.
    pub fn list_recent_for_owner(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_TABLE)?;

        let mut chats = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let chat: Chat = serde_json::from_slice(value.value())?;
            if chat.owner_id == owner_id {
                chats.push(chat);
            }
        }

        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats.truncate(RECENT_CHATS_LIMIT);

        Ok(chats.iter().map(ChatSummary::from).collect())
    }

    /// Delete a chat if it belongs to the given owner. Returns whether a
    /// chat was removed.
    pub fn delete_for_owner(&self, id: &str, owner_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(CHAT_TABLE)?;
            let owned = match table.get(id)? {
                Some(value) => {
                    let chat: Chat = serde_json::from_slice(value.value())?;
                    chat.owner_id == owner_id
                }
                None => false,
            };
            if owned {
                table.remove(id)?;
            }
            owned
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Delete every chat owned by a user (account deletion).
    pub fn delete_all_for_owner(&self, owner_id: &str) -> Result<usize> {
        let ids: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(CHAT_TABLE)?;
            let mut ids = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let chat: Chat = serde_json::from_slice(value.value())?;
                if chat.owner_id == owner_id {
                    ids.push(key.value().to_string());
                }
            }
            ids
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHAT_TABLE)?;
            for id in &ids {
                table.remove(id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(ids.len())
    }
}
