use serde_derive::Deserialize;
use serde_derive::Serialize;

/// One exchange of a conversation. A turn still waiting on an answer has no
/// assistant text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_text: String,
    pub assistant_text: Option<String>,
}

impl ChatTurn {
    pub fn pending(user_text: &str) -> ChatTurn {
        return ChatTurn {
            user_text: user_text.to_string(),
            assistant_text: None,
        };
    }

    pub fn answered(user_text: &str, assistant_text: &str) -> ChatTurn {
        return ChatTurn {
            user_text: user_text.to_string(),
            assistant_text: Some(assistant_text.to_string()),
        };
    }
}
