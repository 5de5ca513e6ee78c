#[cfg(test)]
#[path = "docfaq_api_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AnswerRequest;
use crate::domain::models::Approach;
use crate::domain::models::AssembledAnswer;
use crate::domain::models::Backend;
use crate::domain::models::ChatTurn;
use crate::domain::models::ConversationContent;
use crate::domain::models::ConversationSummary;
use crate::domain::models::Identity;
use crate::domain::models::Overrides;
use crate::domain::models::RequestFailed;
use crate::domain::models::REQUEST_FAILED_MESSAGE;
use crate::domain::services::StreamAssembler;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UserInfoResponse {
    name: Option<String>,
    preferred_username: Option<String>,
    roles: Option<serde_json::Value>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConversationsRequest {
    #[serde(rename = "loginUser")]
    login_user: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConversationRecord {
    conversation_id: String,
    approach: String,
    title: Option<String>,
    timestamp: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConversationsResponse {
    #[serde(default)]
    conversations: Vec<ConversationRecord>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContentRequest {
    conversation_id: String,
    approach: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContentMessage {
    role: String,
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    conversations: Vec<ContentMessage>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DeleteRequest {
    conversation_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum HistoryTurn {
    Chat {
        user: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        assistant: Option<String>,
    },
    DocSearch {
        user: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        bot: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum RequestOverrides {
    #[serde(rename_all = "camelCase")]
    Chat {
        gpt_model: String,
        temperature: String,
        system_prompt: String,
    },
    #[serde(rename_all = "camelCase")]
    DocSearch {
        gpt_model: String,
        temperature: String,
        top: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        exclude_category: Option<String>,
        semantic_ranker: bool,
        semantic_captions: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AnswerBody {
    history: Vec<HistoryTurn>,
    approach: String,
    overrides: RequestOverrides,
    #[serde(rename = "conversationId")]
    conversation_id: String,
    timestamp: String,
    conversation_title: Option<String>,
    #[serde(rename = "loginUser")]
    login_user: String,
}

impl AnswerBody {
    fn new(request: &AnswerRequest) -> AnswerBody {
        let approach = request.approach();
        let history = request
            .history
            .iter()
            .map(|turn| {
                let user = turn.user_text.to_string();
                let answer = turn.assistant_text.clone();
                match approach {
                    Approach::Chat => {
                        return HistoryTurn::Chat {
                            user,
                            assistant: answer,
                        }
                    }
                    Approach::DocSearch => return HistoryTurn::DocSearch { user, bot: answer },
                }
            })
            .collect::<Vec<HistoryTurn>>();

        let overrides = match &request.overrides {
            Overrides::Chat(chat) => RequestOverrides::Chat {
                gpt_model: chat.gpt_model.to_string(),
                temperature: chat.temperature.to_string(),
                system_prompt: chat.system_prompt.to_string(),
            },
            Overrides::DocSearch(docsearch) => RequestOverrides::DocSearch {
                gpt_model: docsearch.gpt_model.to_string(),
                temperature: docsearch.temperature.to_string(),
                top: docsearch.top,
                exclude_category: docsearch.exclude_category.clone(),
                semantic_ranker: docsearch.semantic_ranker,
                semantic_captions: docsearch.semantic_captions,
            },
        };

        return AnswerBody {
            history,
            approach: approach.backend_code().to_string(),
            overrides,
            conversation_id: request.conversation_id.to_string(),
            timestamp: request.timestamp.to_string(),
            conversation_title: request.conversation_title.clone(),
            login_user: request.login_user.to_string(),
        };
    }
}

/// Extracts the `{"error": ...}` message from a failed response body.
fn error_message(body: &str) -> String {
    if let Ok(ErrorResponse { error: Some(error) }) = serde_json::from_str::<ErrorResponse>(body) {
        if !error.is_empty() {
            return error;
        }
    }

    return REQUEST_FAILED_MESSAGE.to_string();
}

fn roles_claim(roles: &serde_json::Value) -> Option<String> {
    if let Some(roles_str) = roles.as_str() {
        return Some(roles_str.to_string());
    }

    if let Some(roles_list) = roles.as_array() {
        return Some(
            roles_list
                .iter()
                .filter_map(|e| return e.as_str())
                .collect::<Vec<&str>>()
                .join(","),
        );
    }

    return None;
}

/// Pairs each user message with the assistant message that follows it.
/// Anything out of order is skipped.
fn pair_turns(messages: &[ContentMessage]) -> Vec<ChatTurn> {
    let mut turns = vec![];
    let mut question: Option<&str> = None;
    for message in messages {
        match message.role.as_str() {
            "user" => {
                if let Some(skipped) = question {
                    tracing::debug!(question = skipped, "Skipping unanswered question");
                }
                question = Some(message.content.as_str());
            }
            "assistant" | "bot" => {
                if let Some(user_text) = question.take() {
                    turns.push(ChatTurn::answered(user_text, &message.content));
                }
            }
            role => {
                tracing::debug!(role = role, "Skipping message with an unknown role");
            }
        }
    }

    return turns;
}

pub struct DocFaqApi {
    url: String,
    timeout: String,
}

impl Default for DocFaqApi {
    fn default() -> DocFaqApi {
        return DocFaqApi::new(
            &Config::get(ConfigKey::ApiURL),
            &Config::get(ConfigKey::HealthCheckTimeout),
        );
    }
}

impl DocFaqApi {
    /// `timeout` is the health check timeout in milliseconds.
    pub fn new(url: &str, timeout: &str) -> DocFaqApi {
        return DocFaqApi {
            url: url.trim_end_matches('/').to_string(),
            timeout: timeout.to_string(),
        };
    }
}

#[async_trait]
impl Backend for DocFaqApi {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("API URL is not defined");
        }

        let res = reqwest::Client::new()
            .get(format!("{url}/", url = self.url))
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Document FAQ API is not reachable");
                bail!(format!("Document FAQ API is not reachable at {}", self.url));
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Document FAQ API health check failed");
            bail!("Document FAQ API health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn user_info(&self, access_token: &str) -> Result<Identity> {
        let res = reqwest::Client::new()
            .get(format!("{url}/userinfo", url = self.url))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            tracing::error!(status = status, "Failed to fetch user info");
            bail!(format!("Failed to fetch user info, status {status}"));
        }

        let user_info = res.json::<UserInfoResponse>().await?;
        let roles = match user_info.roles.as_ref().and_then(roles_claim) {
            Some(roles) => roles,
            None => bail!("User info has no roles claim"),
        };

        let display_name = user_info
            .name
            .or(user_info.preferred_username)
            .unwrap_or_default();

        return Ok(Identity {
            display_name,
            roles,
        });
    }

    #[allow(clippy::implicit_return)]
    async fn list_conversations(&self, login_user: &str) -> Result<Vec<ConversationSummary>> {
        let res = reqwest::Client::new()
            .post(format!("{url}/", url = self.url))
            .json(&ConversationsRequest {
                login_user: login_user.to_string(),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await?;
            tracing::error!(status = status, "Failed to list conversations");
            bail!(format!("Request failed with status {status}: {body}"));
        }

        let records = match res.json::<Option<ConversationsResponse>>().await? {
            Some(body) => body.conversations,
            None => vec![],
        };

        let summaries = records
            .into_iter()
            .filter_map(|record| {
                let approach = match Approach::parse(&record.approach) {
                    Some(approach) => approach,
                    None => {
                        tracing::warn!(
                            conversation_id = record.conversation_id,
                            approach = record.approach,
                            "Skipping conversation with an unknown approach"
                        );
                        return None;
                    }
                };

                return Some(ConversationSummary {
                    conversation_id: record.conversation_id,
                    approach,
                    title: record.title.unwrap_or_default(),
                    timestamp_token: record.timestamp.filter(|e| return !e.is_empty()),
                });
            })
            .collect::<Vec<ConversationSummary>>();

        return Ok(summaries);
    }

    #[allow(clippy::implicit_return)]
    async fn conversation_content(
        &self,
        conversation_id: &str,
        approach: Approach,
    ) -> Result<ConversationContent> {
        let res = reqwest::Client::new()
            .post(format!("{url}/conversationcontent", url = self.url))
            .json(&ContentRequest {
                conversation_id: conversation_id.to_string(),
                approach: approach.to_string(),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let body = res.text().await?;
            bail!(error_message(&body));
        }

        let messages = match res.json::<Option<ContentResponse>>().await? {
            Some(body) => body.conversations,
            None => vec![],
        };

        return Ok(ConversationContent {
            conversation_id: conversation_id.to_string(),
            approach,
            turns: pair_turns(&messages),
        });
    }

    #[allow(clippy::implicit_return)]
    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        let res = reqwest::Client::new()
            .post(format!("{url}/delete", url = self.url))
            .json(&DeleteRequest {
                conversation_id: conversation_id.to_string(),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let body = res.text().await?;
            bail!(error_message(&body));
        }

        let body = res.json::<DeleteResponse>().await?;
        return Ok(body.success);
    }

    #[allow(clippy::implicit_return)]
    async fn get_answer(
        &self,
        request: &AnswerRequest,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send + '_),
    ) -> Result<AssembledAnswer, RequestFailed> {
        let approach = request.approach();
        let res = reqwest::Client::new()
            .post(format!("{url}{endpoint}", url = self.url, endpoint = approach.endpoint()))
            .json(&AnswerBody::new(request))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => return Err(StreamAssembler::reject(&err.to_string(), sink)),
        };

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(
                status = status,
                approach = approach.to_string(),
                "Answer request was rejected"
            );
            return Err(StreamAssembler::reject(&error_message(&body), sink));
        }

        return StreamAssembler::new()
            .consume(res.bytes_stream(), sink)
            .await;
    }
}
