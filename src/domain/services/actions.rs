#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::models::Action;
use crate::domain::models::AnswerRequest;
use crate::domain::models::Approach;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::BackendBox;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;

type SharedBackend = Arc<dyn Backend + Send + Sync>;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) - Start a new conversation.
- /history (/hi) - List your past conversations grouped by date.
- /open (/o) [CONVERSATION_ID] - Open a past conversation and continue it.
- /delete (/d) [CONVERSATION_ID] - Delete a past conversation. Lecturers only.
- /retry (/r) - Ask the last question again.
- /cite (/c) [NUMBER] - Print the link to a cited document from the last answer.
- /quit /exit (/q) - Exit docfaq.
- /help (/h) - Provides this help menu.

HOTKEYS:
- CTRL+C - Exit docfaq.
- CTRL+D - Exit docfaq.
        "#;

    return text.trim().to_string();
}

fn worker_error(err: anyhow::Error, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    tracing::error!(error = ?err, "Backend action failed");
    tx.send(Event::BackendMessage(Message::new_with_type(
        Author::Docfaq,
        MessageType::Error,
        &format!("The backend failed with the following error: {err}"),
    )))?;

    return Ok(());
}

async fn refresh_history(
    backend: &SharedBackend,
    login_user: &str,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    match backend.list_conversations(login_user).await {
        Ok(conversations) => {
            tx.send(Event::HistoryUpdated(conversations))?;
        }
        Err(err) => {
            worker_error(err, tx)?;
        }
    }

    return Ok(());
}

async fn answer(
    backend: SharedBackend,
    login_user: String,
    request: AnswerRequest,
    tx: mpsc::UnboundedSender<Event>,
) -> Result<()> {
    let conversation_id = request.conversation_id.to_string();

    let fragment_tx = tx.clone();
    let fragment_id = conversation_id.to_string();
    let mut sink = move |text: &str| {
        if fragment_tx
            .send(Event::AnswerFragment(fragment_id.to_string(), text.to_string()))
            .is_err()
        {
            tracing::debug!("Answer fragment dropped, the receiver is gone");
        }
    };

    match backend.get_answer(&request, &mut sink).await {
        Ok(answer) => {
            tx.send(Event::AnswerDone(conversation_id, answer))?;
        }
        Err(failed) => {
            tracing::warn!(
                reason = failed.message,
                partial_len = failed.partial.len(),
                "Answer request failed"
            );
            tx.send(Event::AnswerFailed(conversation_id, failed.message))?;
        }
    }

    refresh_history(&backend, &login_user, &tx).await?;

    return Ok(());
}

async fn delete_conversation(
    backend: &SharedBackend,
    login_user: &str,
    conversation_id: &str,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    match backend.delete_conversation(conversation_id).await {
        Ok(true) => {
            tx.send(Event::ConversationDeleted(conversation_id.to_string()))?;
        }
        Ok(false) => {
            tx.send(Event::BackendMessage(Message::new_with_type(
                Author::Docfaq,
                MessageType::Error,
                &format!("The conversation {conversation_id} could not be deleted."),
            )))?;
        }
        Err(err) => {
            worker_error(err, tx)?;
        }
    }

    return refresh_history(backend, login_user, tx).await;
}

async fn load_conversation(
    backend: &SharedBackend,
    conversation_id: &str,
    approach: Approach,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    match backend.conversation_content(conversation_id, approach).await {
        Ok(content) => {
            tx.send(Event::ConversationLoaded(content))?;
        }
        Err(err) => {
            worker_error(err, tx)?;
        }
    }

    return Ok(());
}

pub struct ActionsService {}

impl ActionsService {
    /// Runs actions until the sending side of `rx` is dropped. Answers stream
    /// in a worker task so they can be aborted, everything else runs in
    /// order.
    pub async fn start(
        backend: BackendBox,
        login_user: &str,
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let backend: SharedBackend = Arc::from(backend);

        // Lazy default.
        let mut worker: JoinHandle<Result<()>> = tokio::spawn(async {
            return Ok(());
        });

        while let Some(action) = rx.recv().await {
            match action {
                Action::BackendAbort() => {
                    if !worker.is_finished() {
                        worker.abort();
                        tx.send(Event::BackendMessage(Message::new(
                            Author::Docfaq,
                            "Stopped waiting on the previous answer.",
                        )))?;
                    }
                }
                Action::BackendRequest(request) => {
                    let worker_backend = backend.clone();
                    let worker_login_user = login_user.to_string();
                    let worker_tx = tx.clone();
                    worker = tokio::spawn(async move {
                        return answer(worker_backend, worker_login_user, request, worker_tx)
                            .await;
                    });
                }
                Action::DeleteConversation(conversation_id) => {
                    delete_conversation(&backend, login_user, &conversation_id, &tx).await?;
                }
                Action::LoadConversation(conversation_id, approach) => {
                    load_conversation(&backend, &conversation_id, approach, &tx).await?;
                }
                Action::RefreshHistory() => {
                    refresh_history(&backend, login_user, &tx).await?;
                }
            }
        }

        // No more actions can arrive, let an in-flight answer finish.
        if let Ok(Err(err)) = worker.await {
            tracing::error!(error = ?err, "Answer worker failed");
        }

        return Ok(());
    }
}
