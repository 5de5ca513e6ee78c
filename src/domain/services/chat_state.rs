#[cfg(test)]
#[path = "chat_state_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use chrono::DateTime;
use chrono::FixedOffset;

use super::answer_parser::citation_file_path;
use super::answer_parser::parse_chat_answer;
use super::answer_parser::parse_docsearch_answer;
use super::SessionContext;
use crate::domain::models::AnswerRequest;
use crate::domain::models::Approach;
use crate::domain::models::AssembledAnswer;
use crate::domain::models::ChatTurn;
use crate::domain::models::ConversationContent;
use crate::domain::models::Overrides;
use crate::domain::models::END_OF_RESPONSE;

/// Conversation state of one approach as seen by the interactive loop.
pub struct ChatState {
    pub approach: Approach,
    pub turns: Vec<ChatTurn>,
    /// Text streamed so far for the answer being waited on.
    pub stream_buffer: String,
    pub last_question: Option<String>,
    pub last_error: Option<String>,
    pub citations: Vec<String>,
    pub followup_questions: Vec<String>,
    pending_conversation_id: Option<String>,
}

impl ChatState {
    pub fn new(approach: Approach) -> ChatState {
        return ChatState {
            approach,
            turns: vec![],
            stream_buffer: "".to_string(),
            last_question: None,
            last_error: None,
            citations: vec![],
            followup_questions: vec![],
            pending_conversation_id: None,
        };
    }

    pub fn is_waiting(&self) -> bool {
        return self.pending_conversation_id.is_some();
    }

    fn is_pending(&self, conversation_id: &str) -> bool {
        return self.pending_conversation_id.as_deref() == Some(conversation_id);
    }

    /// Builds the request for `question`, sending every completed turn as
    /// history. Marks the state as waiting on the session's conversation.
    pub fn build_request(
        &mut self,
        question: &str,
        session: &mut SessionContext,
        now: &DateTime<FixedOffset>,
        login_user: &str,
    ) -> Result<AnswerRequest> {
        if self.is_waiting() {
            bail!("Still waiting on the previous answer");
        }

        let mut history = self
            .turns
            .iter()
            .filter(|e| return e.assistant_text.is_some())
            .cloned()
            .collect::<Vec<ChatTurn>>();
        history.push(ChatTurn::pending(question));

        let request = AnswerRequest {
            history,
            overrides: Overrides::from_config(self.approach)?,
            conversation_id: session.conversation_id().to_string(),
            timestamp: session.timestamp_for_request(now),
            conversation_title: session.conversation_title().map(|e| return e.to_string()),
            login_user: login_user.to_string(),
        };

        self.last_question = Some(question.to_string());
        self.last_error = None;
        self.stream_buffer = "".to_string();
        self.pending_conversation_id = Some(request.conversation_id.to_string());

        return Ok(request);
    }

    /// Rebuilds the request for the last question. A question that was
    /// answered is dropped from the turns and asked again.
    pub fn build_retry_request(
        &mut self,
        session: &mut SessionContext,
        now: &DateTime<FixedOffset>,
        login_user: &str,
    ) -> Result<Option<AnswerRequest>> {
        let question = match &self.last_question {
            Some(question) => question.to_string(),
            None => return Ok(None),
        };

        if self.last_error.is_none()
            && self.turns.last().map(|e| return e.user_text.as_str()) == Some(question.as_str())
        {
            self.turns.pop();
        }

        return Ok(Some(self.build_request(&question, session, now, login_user)?));
    }

    /// Applies a streamed fragment, returning the text to display. Fragments
    /// for a conversation that is no longer awaited are discarded.
    pub fn handle_fragment(&mut self, conversation_id: &str, text: &str) -> Option<String> {
        if !self.is_pending(conversation_id) {
            tracing::debug!(
                conversation_id = conversation_id,
                "Discarding fragment for a stale conversation"
            );
            return None;
        }

        if text == END_OF_RESPONSE {
            return None;
        }
        if text.is_empty() {
            self.stream_buffer = "".to_string();
            return None;
        }

        self.stream_buffer.push_str(text);
        return Some(text.to_string());
    }

    /// Records the final answer as a turn and returns its rendered text.
    pub fn handle_done(&mut self, conversation_id: &str, answer: &AssembledAnswer) -> Option<String> {
        if !self.is_pending(conversation_id) {
            tracing::debug!(
                conversation_id = conversation_id,
                "Discarding answer for a stale conversation"
            );
            return None;
        }

        self.pending_conversation_id = None;
        self.stream_buffer = "".to_string();
        let question = self.last_question.clone().unwrap_or_default();
        self.turns.push(ChatTurn::answered(&question, &answer.text));

        if answer.is_error() {
            self.citations = vec![];
            self.followup_questions = vec![];
            return Some(answer.text.to_string());
        }

        match self.approach {
            Approach::Chat => {
                return Some(parse_chat_answer(&answer.text));
            }
            Approach::DocSearch => {
                let parsed = parse_docsearch_answer(&answer.text);
                self.citations = parsed.citations;
                self.followup_questions = parsed.followup_questions;
                return Some(parsed.text);
            }
        }
    }

    /// Records a failed request. The question is kept for a retry and the
    /// returned text is what to display.
    pub fn handle_failed(&mut self, conversation_id: &str, message: &str) -> Option<String> {
        if !self.is_pending(conversation_id) {
            return None;
        }

        self.pending_conversation_id = None;
        self.stream_buffer = "".to_string();
        self.last_error = Some(message.to_string());

        return Some(format!(
            "An error occurred: {message}. Use /retry to ask again."
        ));
    }

    /// Stops waiting on the in-flight answer. Anything still streamed for it
    /// is discarded.
    pub fn abort(&mut self) {
        self.pending_conversation_id = None;
        self.stream_buffer = "".to_string();
    }

    pub fn reset(&mut self) {
        let approach = self.approach;
        *self = ChatState::new(approach);
    }

    pub fn load(&mut self, content: ConversationContent) {
        self.reset();
        self.last_question = content.turns.last().map(|e| return e.user_text.to_string());
        self.turns = content.turns;
    }

    /// Link to the `number`th citation of the last answer, counting from 1.
    pub fn citation_link(&self, api_url: &str, number: usize) -> Option<String> {
        if number == 0 {
            return None;
        }

        let citation = self.citations.get(number - 1)?;
        return Some(format!("{api_url}{}", citation_file_path(citation)));
    }
}
