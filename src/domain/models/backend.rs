use anyhow::Result;
use async_trait::async_trait;

use super::AnswerRequest;
use super::Approach;
use super::AssembledAnswer;
use super::ConversationContent;
use super::ConversationSummary;
use super::Identity;
use super::RequestFailed;

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the backend is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Resolves the signed in user and their role claim from an access token.
    async fn user_info(&self, access_token: &str) -> Result<Identity>;

    /// Returns every conversation summary stored for a user, both approaches
    /// included.
    async fn list_conversations(&self, login_user: &str) -> Result<Vec<ConversationSummary>>;

    async fn conversation_content(
        &self,
        conversation_id: &str,
        approach: Approach,
    ) -> Result<ConversationContent>;

    /// Returns the backend's success flag.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool>;

    /// Requests an answer and streams it. Each decoded fragment is passed to
    /// `sink` in arrival order, and the assembled answer is returned once the
    /// stream ends.
    ///
    /// In-band errors are not failures, they come back as an
    /// `AssembledAnswer` with an error kind set.
    async fn get_answer(
        &self,
        request: &AnswerRequest,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> Result<AssembledAnswer, RequestFailed>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
