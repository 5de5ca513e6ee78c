#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::path;

use anyhow::anyhow;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedSession {
    conversation_id: String,
    version: String,
}

/// Saves the selected conversation id as JSON in the cache directory.
pub struct FileStore {
    pub cache_dir: path::PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: path::PathBuf) -> FileStore {
        return FileStore { cache_dir };
    }

    pub fn from_cache_dir() -> Result<FileStore> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| return anyhow!("Could not resolve the cache directory"))?
            .join("docfaq");

        return Ok(FileStore::new(cache_dir));
    }

    fn get_file_path(&self) -> path::PathBuf {
        return self.cache_dir.join("session.json");
    }
}

#[async_trait]
impl SessionStore for FileStore {
    #[allow(clippy::implicit_return)]
    async fn load(&self) -> Result<Option<String>> {
        let file_path = self.get_file_path();
        if !file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(file_path).await?;
        match serde_json::from_str::<SavedSession>(&payload) {
            Ok(session) => return Ok(Some(session.conversation_id)),
            Err(err) => {
                tracing::warn!(error = ?err, "Ignoring unreadable session file");
                return Ok(None);
            }
        }
    }

    #[allow(clippy::implicit_return)]
    async fn save(&self, conversation_id: &str) -> Result<()> {
        let session = SavedSession {
            conversation_id: conversation_id.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let payload = serde_json::to_string_pretty(&session)?;

        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await?;
        }

        let mut file = fs::File::create(self.get_file_path()).await?;
        file.write_all(payload.as_bytes()).await?;

        return Ok(());
    }
}
