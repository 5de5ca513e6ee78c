use std::env;

use anyhow::Result;
use tokio::fs;
use uuid::Uuid;

use super::FileStore;
use crate::domain::models::SessionStore;

fn temp_store() -> FileStore {
    let cache_dir = env::temp_dir().join(format!("docfaq-test-{}", Uuid::new_v4()));
    return FileStore::new(cache_dir);
}

#[tokio::test]
async fn it_loads_nothing_before_saving() -> Result<()> {
    let store = temp_store();
    assert_eq!(store.load().await?, None);

    return Ok(());
}

#[tokio::test]
async fn it_saves_and_loads_the_conversation_id() -> Result<()> {
    let store = temp_store();
    store.save("conversation-1").await?;
    store.save("conversation-2").await?;

    assert_eq!(store.load().await?, Some("conversation-2".to_string()));

    fs::remove_dir_all(&store.cache_dir).await?;
    return Ok(());
}

#[tokio::test]
async fn it_ignores_corrupt_session_files() -> Result<()> {
    let store = temp_store();
    fs::create_dir_all(&store.cache_dir).await?;
    fs::write(store.cache_dir.join("session.json"), "not json").await?;

    assert_eq!(store.load().await?, None);

    fs::remove_dir_all(&store.cache_dir).await?;
    return Ok(());
}
