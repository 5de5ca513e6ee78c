pub const END_OF_RESPONSE: &str = "\n[END OF RESPONSE]";
pub const INVALID_REQUEST_ERROR: &str = "\n[InvalidRequestError]";
pub const SERVER_ERROR: &str = "\n[ERROR]";

pub const TOKEN_LIMIT_MESSAGE: &str = "The conversation has grown past the model's token limit. Start a new conversation with /new and ask again.";
pub const SERVER_ERROR_MESSAGE: &str =
    "The assistant ran into an error while answering. Please try again in a moment.";
pub const REQUEST_FAILED_MESSAGE: &str = "Unknown error";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnswerErrorKind {
    None,
    TokenLimitExceeded,
    ServerError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledAnswer {
    pub text: String,
    pub error_kind: AnswerErrorKind,
}

impl AssembledAnswer {
    pub fn new(text: &str) -> AssembledAnswer {
        return AssembledAnswer {
            text: text.to_string(),
            error_kind: AnswerErrorKind::None,
        };
    }

    pub fn token_limit_exceeded() -> AssembledAnswer {
        return AssembledAnswer {
            text: TOKEN_LIMIT_MESSAGE.to_string(),
            error_kind: AnswerErrorKind::TokenLimitExceeded,
        };
    }

    pub fn server_error() -> AssembledAnswer {
        return AssembledAnswer {
            text: SERVER_ERROR_MESSAGE.to_string(),
            error_kind: AnswerErrorKind::ServerError,
        };
    }

    pub fn is_error(&self) -> bool {
        return self.error_kind != AnswerErrorKind::None;
    }
}

/// Transport level failure of an answer request. Any text decoded before the
/// failure is kept in `partial` but is never shown as an answer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestFailed {
    pub message: String,
    pub partial: String,
}

impl RequestFailed {
    pub fn new(message: &str) -> RequestFailed {
        return RequestFailed {
            message: message.to_string(),
            partial: "".to_string(),
        };
    }
}
