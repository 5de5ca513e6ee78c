use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::SessionStore;

/// Keeps the selected conversation id in memory only. Clones share the same
/// slot, so a clone can observe what a boxed store saved.
#[derive(Clone, Default)]
pub struct MemoryStore {
    conversation_id: Arc<Mutex<Option<String>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_id(conversation_id: &str) -> MemoryStore {
        return MemoryStore {
            conversation_id: Arc::new(Mutex::new(Some(conversation_id.to_string()))),
        };
    }

    pub async fn saved(&self) -> Option<String> {
        return self.conversation_id.lock().await.clone();
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    #[allow(clippy::implicit_return)]
    async fn load(&self) -> Result<Option<String>> {
        return Ok(self.conversation_id.lock().await.clone());
    }

    #[allow(clippy::implicit_return)]
    async fn save(&self, conversation_id: &str) -> Result<()> {
        *self.conversation_id.lock().await = Some(conversation_id.to_string());
        return Ok(());
    }
}
