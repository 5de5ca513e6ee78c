#[cfg(test)]
#[path = "session_context_test.rs"]
mod tests;

use anyhow::Result;
use chrono::DateTime;
use chrono::FixedOffset;
use uuid::Uuid;

use crate::domain::models::create_timestamp_token;
use crate::domain::models::SessionStoreBox;

/// The conversation currently selected by the user. Every answer request is
/// filed under this conversation id.
pub struct SessionContext {
    conversation_id: String,
    conversation_title: Option<String>,
    timestamp: Option<String>,
    store: SessionStoreBox,
}

impl SessionContext {
    pub fn create_id() -> String {
        return Uuid::new_v4().to_string();
    }

    /// Resumes the conversation saved in `store`, or starts a new one when
    /// nothing was saved.
    pub async fn restore(store: SessionStoreBox) -> Result<SessionContext> {
        let conversation_id = match store.load().await? {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = SessionContext::create_id();
                store.save(&id).await?;
                id
            }
        };

        tracing::debug!(conversation_id = conversation_id, "Session restored");

        return Ok(SessionContext {
            conversation_id,
            conversation_title: None,
            timestamp: None,
            store,
        });
    }

    pub fn conversation_id(&self) -> &str {
        return &self.conversation_id;
    }

    pub fn conversation_title(&self) -> Option<&str> {
        return self.conversation_title.as_deref();
    }

    #[cfg(test)]
    pub fn timestamp(&self) -> Option<&str> {
        return self.timestamp.as_deref();
    }

    pub async fn new_conversation(&mut self) -> Result<()> {
        let id = SessionContext::create_id();
        self.store.save(&id).await?;

        self.conversation_id = id;
        self.conversation_title = None;
        self.timestamp = None;

        return Ok(());
    }

    /// Switches to an existing conversation. Its timestamp is fixed again by
    /// the next request.
    pub async fn select(&mut self, conversation_id: &str, title: Option<&str>) -> Result<()> {
        self.store.save(conversation_id).await?;

        self.conversation_id = conversation_id.to_string();
        self.conversation_title = title.map(|e| return e.to_string());
        self.timestamp = None;

        return Ok(());
    }

    /// Timestamp token sent with a request. The first request of a
    /// conversation fixes it and later requests reuse it.
    pub fn timestamp_for_request(&mut self, now: &DateTime<FixedOffset>) -> String {
        if let Some(timestamp) = &self.timestamp {
            return timestamp.to_string();
        }

        let timestamp = create_timestamp_token(now);
        self.timestamp = Some(timestamp.to_string());

        return timestamp;
    }
}
