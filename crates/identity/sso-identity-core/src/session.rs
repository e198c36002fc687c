//! Session-store abstraction.
//!
//! The framework reads and writes a handful of string keys on the
//! current user's session; the backing store (cookies, database, cache)
//! belongs to the host application. [`MemorySessionStore`] is the
//! reference backend used in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::IdentityResult;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> IdentityResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> IdentityResult<()>;

    async fn remove(&self, key: &str) -> IdentityResult<Option<String>>;

    /// Drop every key, ending the session.
    async fn clear(&self) -> IdentityResult<()>;
}

/// In-memory implementation of [`SessionStore`].
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> IdentityResult<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> IdentityResult<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> IdentityResult<Option<String>> {
        let mut values = self.values.write().await;
        Ok(values.remove(key))
    }

    async fn clear(&self) -> IdentityResult<()> {
        let mut values = self.values.write().await;
        values.clear();
        Ok(())
    }
}
