//! In-memory user directory.

use async_trait::async_trait;
use classbook_core::directory::{UserDirectory, UserRecord};
use classbook_core::store::StoreError;
use classbook_core::types::UserKey;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory [`UserDirectory`] implementation.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    users: Arc<RwLock<HashMap<UserKey, UserRecord>>>,
}

impl MemoryDirectory {
    /// Creates an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory seeded with the given users
    #[must_use]
    pub fn with_users(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let directory = Self::new();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    /// Inserts or replaces a user
    pub fn insert(&self, record: UserRecord) {
        if let Ok(mut users) = self.users.write() {
            users.insert(record.key.clone(), record);
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_key(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError> {
        self.users
            .read()
            .map_err(|_| StoreError::Backend("user directory lock poisoned".to_string()))
            .map(|users| users.get(key).cloned())
    }
}
