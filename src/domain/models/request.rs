#[cfg(test)]
#[path = "request_test.rs"]
mod tests;

use anyhow::Result;

use super::Approach;
use super::ChatTurn;
use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOverrides {
    pub gpt_model: String,
    pub temperature: String,
    pub system_prompt: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocSearchOverrides {
    pub gpt_model: String,
    pub temperature: String,
    pub top: u32,
    pub exclude_category: Option<String>,
    pub semantic_ranker: bool,
    pub semantic_captions: bool,
}

/// Model settings sent alongside a question. The variant decides which
/// approach the request is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overrides {
    Chat(ChatOverrides),
    DocSearch(DocSearchOverrides),
}

impl Overrides {
    pub fn from_config(approach: Approach) -> Result<Overrides> {
        let gpt_model = Config::get(ConfigKey::GptModel);
        let temperature = Config::get(ConfigKey::Temperature);

        match approach {
            Approach::Chat => {
                return Ok(Overrides::Chat(ChatOverrides {
                    gpt_model,
                    temperature,
                    system_prompt: Config::get(ConfigKey::SystemPrompt),
                }));
            }
            Approach::DocSearch => {
                let exclude_category = Config::get(ConfigKey::ExcludeCategory);
                return Ok(Overrides::DocSearch(DocSearchOverrides {
                    gpt_model,
                    temperature,
                    top: Config::get(ConfigKey::RetrieveCount).parse::<u32>()?,
                    exclude_category: if exclude_category.is_empty() {
                        None
                    } else {
                        Some(exclude_category)
                    },
                    semantic_ranker: Config::get(ConfigKey::SemanticRanker).parse::<bool>()?,
                    semantic_captions: Config::get(ConfigKey::SemanticCaptions).parse::<bool>()?,
                }));
            }
        }
    }

    pub fn approach(&self) -> Approach {
        match self {
            Overrides::Chat(_) => return Approach::Chat,
            Overrides::DocSearch(_) => return Approach::DocSearch,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRequest {
    /// Completed turns followed by the question being asked.
    pub history: Vec<ChatTurn>,
    pub overrides: Overrides,
    pub conversation_id: String,
    pub timestamp: String,
    pub conversation_title: Option<String>,
    pub login_user: String,
}

impl AnswerRequest {
    pub fn approach(&self) -> Approach {
        return self.overrides.approach();
    }

    pub fn question(&self) -> &str {
        if let Some(turn) = self.history.last() {
            return &turn.user_text;
        }

        return "";
    }
}
