use anyhow::Result;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::TimeZone;

use super::SessionContext;
use crate::infrastructure::stores::MemoryStore;

fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    return offset
        .with_ymd_and_hms(2024, 10, 2, hour, minute, 0)
        .single()
        .unwrap();
}

#[tokio::test]
async fn it_restores_the_saved_conversation() -> Result<()> {
    let store = MemoryStore::with_id("saved-id");
    let session = SessionContext::restore(Box::new(store.clone())).await?;

    assert_eq!(session.conversation_id(), "saved-id");
    assert_eq!(session.timestamp(), None);

    return Ok(());
}

#[tokio::test]
async fn it_creates_and_saves_a_conversation_when_none_is_saved() -> Result<()> {
    let store = MemoryStore::default();
    let session = SessionContext::restore(Box::new(store.clone())).await?;

    assert_eq!(session.conversation_id().len(), 36);
    assert_eq!(store.saved().await, Some(session.conversation_id().to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_fixes_the_timestamp_on_the_first_request() -> Result<()> {
    let mut session = SessionContext::restore(Box::<MemoryStore>::default()).await?;

    assert_eq!(session.timestamp_for_request(&at(10, 0)), "20241002100000");
    assert_eq!(session.timestamp_for_request(&at(11, 30)), "20241002100000");

    return Ok(());
}

#[tokio::test]
async fn it_resets_when_starting_a_new_conversation() -> Result<()> {
    let store = MemoryStore::with_id("old-id");
    let mut session = SessionContext::restore(Box::new(store.clone())).await?;
    session.timestamp_for_request(&at(10, 0));

    session.new_conversation().await?;

    assert_ne!(session.conversation_id(), "old-id");
    assert_eq!(session.timestamp(), None);
    assert_eq!(session.conversation_title(), None);
    assert_eq!(store.saved().await, Some(session.conversation_id().to_string()));
    assert_eq!(session.timestamp_for_request(&at(12, 0)), "20241002120000");

    return Ok(());
}

#[tokio::test]
async fn it_selects_an_existing_conversation() -> Result<()> {
    let store = MemoryStore::default();
    let mut session = SessionContext::restore(Box::new(store.clone())).await?;
    session.timestamp_for_request(&at(10, 0));

    session.select("picked-id", Some("Exam dates")).await?;

    assert_eq!(session.conversation_id(), "picked-id");
    assert_eq!(session.conversation_title(), Some("Exam dates"));
    assert_eq!(session.timestamp(), None);
    assert_eq!(store.saved().await, Some("picked-id".to_string()));

    return Ok(());
}
