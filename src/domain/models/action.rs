use super::AnswerRequest;
use super::Approach;

pub enum Action {
    BackendAbort(),
    BackendRequest(AnswerRequest),
    DeleteConversation(String),
    LoadConversation(String, Approach),
    RefreshHistory(),
}
