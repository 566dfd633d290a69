//! User account storage.

use crate::models::User;
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const USER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

#[derive(Debug, Clone)]
pub struct UserStorage {
    db: Arc<Database>,
}

impl UserStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(USER_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new user. Rejects an email address that is already taken.
    pub fn create(&self, user: &User) -> Result<()> {
        if self.find_by_email(&user.email)?.is_some() {
            return Err(anyhow::anyhow!("Email already in use"));
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_TABLE)?;
            let json_bytes = serde_json::to_vec(user)?;
            table.insert(user.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_TABLE)?;

        if let Some(value) = table.get(id)? {
            let user: User = serde_json::from_slice(value.value())?;
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.scan(|user| user.email == email)
    }

    pub fn find_by_verification_token(&self, token: &str) -> Result<Option<User>> {
        self.scan(|user| user.verification_token.as_deref() == Some(token))
    }

    pub fn update(&self, user: &User) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_TABLE)?;
            if table.get(user.id.as_str())?.is_none() {
                return Err(anyhow::anyhow!("User {} not found", user.id));
            }
            let json_bytes = serde_json::to_vec(user)?;
            table.insert(user.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(USER_TABLE)?;
            table.remove(id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn scan(&self, predicate: impl Fn(&User) -> bool) -> Result<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_TABLE)?;

        for item in table.iter()? {
            let (_, value) = item?;
            let user: User = serde_json::from_slice(value.value())?;
            if predicate(&user) {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (UserStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = UserStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    fn sample_user() -> User {
        User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        )
    }

    #[test]
    fn test_create_and_find_by_email() {
        let (storage, _temp_dir) = setup();

        let user = sample_user();
        storage.create(&user).unwrap();

        let found = storage.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(storage.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (storage, _temp_dir) = setup();

        storage.create(&sample_user()).unwrap();
        let result = storage.create(&sample_user());
        assert!(result.is_err());
    }

    #[test]
    fn test_verification_flow() {
        let (storage, _temp_dir) = setup();

        let user = sample_user();
        let token = user.verification_token.clone().unwrap();
        storage.create(&user).unwrap();

        let mut found = storage.find_by_verification_token(&token).unwrap().unwrap();
        found.is_verified = true;
        found.verification_token = None;
        storage.update(&found).unwrap();

        assert!(storage.find_by_verification_token(&token).unwrap().is_none());
        assert!(storage.get(&user.id).unwrap().unwrap().is_verified);
    }

    #[test]
    fn test_delete() {
        let (storage, _temp_dir) = setup();

        let user = sample_user();
        storage.create(&user).unwrap();

        assert!(storage.delete(&user.id).unwrap());
        assert!(!storage.delete(&user.id).unwrap());
        assert!(storage.get(&user.id).unwrap().is_none());
    }
}
