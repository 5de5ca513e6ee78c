use super::AssembledAnswer;
use super::ConversationContent;
use super::ConversationSummary;
use super::Message;

pub enum Event {
    /// Decoded fragment of the answer being streamed for a conversation.
    AnswerFragment(String, String),
    AnswerDone(String, AssembledAnswer),
    /// The request for a conversation failed before producing an answer.
    AnswerFailed(String, String),
    BackendMessage(Message),
    ConversationDeleted(String),
    ConversationLoaded(ConversationContent),
    HistoryUpdated(Vec<ConversationSummary>),
}
