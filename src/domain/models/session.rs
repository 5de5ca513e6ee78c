use anyhow::Result;
use async_trait::async_trait;

/// Persists the currently selected conversation id between runs.
#[async_trait]
pub trait SessionStore {
    async fn load(&self) -> Result<Option<String>>;

    async fn save(&self, conversation_id: &str) -> Result<()>;
}

pub type SessionStoreBox = Box<dyn SessionStore + Send + Sync>;
