//! User directory collaborator.
//!
//! The engine only ever needs to resolve a key to a known user — account
//! creation, login, and password handling live outside the core.

use crate::store::StoreError;
use crate::types::UserKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A resolved user, as much of one as the engine cares about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's key
    pub key: UserKey,
    /// Display name
    pub name: String,
}

/// Read-only lookup of known users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a key to a user, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lookup backend fails.
    async fn find_by_key(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError>;
}
