use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

/// Conversation mode. Each approach has its own backend endpoint and its own
/// partition of the conversation history.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumVariantNames,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Chat,
    DocSearch,
}

impl Approach {
    pub fn parse(text: &str) -> Option<Approach> {
        return Approach::iter().find(|e| return e.to_string() == text);
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Approach::Chat => return "/chat",
            Approach::DocSearch => return "/docsearch",
        }
    }

    /// Identifier of the backend implementation serving this approach.
    pub fn backend_code(&self) -> &'static str {
        match self {
            Approach::Chat => return "r",
            Approach::DocSearch => return "rrr",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Approach::Chat => return "Chat",
            Approach::DocSearch => return "Training document FAQ",
        }
    }
}
