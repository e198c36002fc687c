//! User-messaging abstraction.
//!
//! Messages queue up server-side and are drained by the host when it
//! renders the next page. Bodies are HTML fragments; whoever composes a
//! message escapes its interpolations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::IdentityResult;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    /// HTML fragment shown to the user.
    pub body: String,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn add(&self, message: Message) -> IdentityResult<()>;

    /// Return and clear the queued messages.
    async fn drain(&self) -> IdentityResult<Vec<Message>>;
}

/// In-memory implementation of [`MessageStore`].
pub struct MemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn add(&self, message: Message) -> IdentityResult<()> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }

    async fn drain(&self) -> IdentityResult<Vec<Message>> {
        let mut messages = self.messages.write().await;
        Ok(std::mem::take(&mut *messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_drain() {
        let store = MemoryMessageStore::new();

        store
            .add(Message {
                level: MessageLevel::Info,
                body: "hello".to_string(),
            })
            .await
            .unwrap();

        let drained = store.drain().await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level, MessageLevel::Info);

        assert!(store.drain().await.unwrap().is_empty());
    }
}
