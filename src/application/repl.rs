#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::fmt::Write as _;
use std::io::Write as _;

use anyhow::Result;
use chrono::FixedOffset;
use owo_colors::OwoColorize;
use owo_colors::Stream;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use super::cli;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::now_in;
use crate::domain::models::parse_utc_offset;
use crate::domain::models::Action;
use crate::domain::models::Approach;
use crate::domain::models::Author;
use crate::domain::models::ChatTurn;
use crate::domain::models::ConversationSummary;
use crate::domain::models::Event;
use crate::domain::models::HistoryGroups;
use crate::domain::models::Identity;
use crate::domain::models::MessageType;
use crate::domain::models::Role;
use crate::domain::models::SessionStoreBox;
use crate::domain::models::SlashCommand;
use crate::domain::services::actions::help_text;
use crate::domain::services::actions::ActionsService;
use crate::domain::services::group_conversations;
use crate::domain::services::parse_chat_answer;
use crate::domain::services::parse_docsearch_answer;
use crate::domain::services::ChatState;
use crate::domain::services::GroupOrder;
use crate::domain::services::SessionContext;
use crate::infrastructure::stores::FileStore;
use crate::infrastructure::stores::MemoryStore;

/// Renders grouped history for the given approaches, newest group first.
/// Empty when there is nothing to show.
pub fn format_history(groups: &HistoryGroups, approaches: &[Approach]) -> String {
    let mut res = String::new();
    for approach in approaches {
        let approach_groups = groups.for_approach(*approach);
        if approach_groups.is_empty() {
            continue;
        }

        if !res.is_empty() {
            res.push('\n');
        }
        res.push_str(approach.title());
        res.push('\n');

        for group in approach_groups {
            let _ = writeln!(res, "  {}", group.label);
            for conversation in &group.conversations {
                let _ = writeln!(
                    res,
                    "    - {} (ID: {})",
                    conversation.title, conversation.conversation_id
                );
            }
        }
    }

    return res.trim_end().to_string();
}

/// Renders the turns of a loaded conversation the way answers are shown live.
pub fn format_turns(turns: &[ChatTurn], approach: Approach) -> String {
    let mut res = String::new();
    for turn in turns {
        let _ = writeln!(res, "{}: {}", Author::User.to_string(), turn.user_text);
        match &turn.assistant_text {
            Some(text) => {
                let rendered = match approach {
                    Approach::Chat => parse_chat_answer(text),
                    Approach::DocSearch => parse_docsearch_answer(text).text,
                };
                let _ = writeln!(res, "{}: {rendered}\n", Author::Assistant.to_string());
            }
            None => {
                res.push_str("(no answer)\n\n");
            }
        }
    }

    return res.trim_end().to_string();
}

fn format_error(text: &str) -> String {
    return text
        .if_supports_color(Stream::Stdout, |e| return e.red())
        .to_string();
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Ready for the next question.
    Prompt,
    /// Still waiting on the backend, keep quiet.
    Wait,
    Quit,
}

pub struct Repl {
    role: Role,
    login_user: String,
    api_url: String,
    offset: FixedOffset,
    order: GroupOrder,
    chat: ChatState,
    session: SessionContext,
    history: Vec<ConversationSummary>,
    tx: mpsc::UnboundedSender<Action>,
}

impl Repl {
    pub fn new(
        approach: Approach,
        identity: &Identity,
        session: SessionContext,
        tx: mpsc::UnboundedSender<Action>,
    ) -> Result<Repl> {
        return Ok(Repl {
            role: identity.role(),
            login_user: identity.display_name.to_string(),
            api_url: Config::get(ConfigKey::ApiURL),
            offset: parse_utc_offset(&Config::get(ConfigKey::UtcOffset))?,
            order: GroupOrder::from_config()?,
            chat: ChatState::new(approach),
            session,
            history: vec![],
            tx,
        });
    }

    pub fn approach(&self) -> Approach {
        return self.chat.approach;
    }

    pub fn conversation_id(&self) -> &str {
        return self.session.conversation_id();
    }

    pub fn prompt(&self) -> String {
        return format!("{}> ", self.chat.approach);
    }

    fn step(&self) -> Step {
        if self.chat.is_waiting() {
            return Step::Wait;
        }

        return Step::Prompt;
    }

    fn permitted_approaches(&self) -> Vec<Approach> {
        return [Approach::Chat, Approach::DocSearch]
            .into_iter()
            .filter(|e| return self.role.can_use(*e))
            .collect::<Vec<Approach>>();
    }

    fn abort_answer(&mut self) -> Result<()> {
        if self.chat.is_waiting() {
            self.tx.send(Action::BackendAbort())?;
            self.chat.abort();
        }

        return Ok(());
    }

    fn send_request(&mut self, question: Option<&str>, out: &mut String) -> Result<()> {
        let now = now_in(&self.offset);
        let res = match question {
            Some(question) => self
                .chat
                .build_request(question, &mut self.session, &now, &self.login_user)
                .map(Some),
            None => self
                .chat
                .build_retry_request(&mut self.session, &now, &self.login_user),
        };

        match res {
            Ok(Some(request)) => {
                self.tx.send(Action::BackendRequest(request))?;
            }
            Ok(None) => {
                out.push_str("There is nothing to retry yet.\n");
            }
            Err(err) => {
                out.push_str(&format_error(&format!("{err}\n")));
            }
        }

        return Ok(());
    }

    async fn open(&mut self, conversation_id: &str, out: &mut String) -> Result<()> {
        let summary = match self
            .history
            .iter()
            .find(|e| return e.conversation_id == conversation_id)
        {
            Some(summary) => summary.clone(),
            None => {
                let _ = writeln!(
                    out,
                    "Unknown conversation {conversation_id}. Use /history to list your conversations."
                );
                return Ok(());
            }
        };

        if !self.role.can_use(summary.approach) {
            out.push_str(&format_error(&format!(
                "Your role cannot open {} conversations.\n",
                summary.approach
            )));
            return Ok(());
        }

        self.abort_answer()?;
        self.session
            .select(&summary.conversation_id, Some(&summary.title))
            .await?;
        self.chat = ChatState::new(summary.approach);
        self.tx.send(Action::LoadConversation(
            summary.conversation_id.to_string(),
            summary.approach,
        ))?;

        let _ = writeln!(out, "Opening \"{}\"...", summary.title);
        return Ok(());
    }

    /// Selects the conversation questions are filed under when the loop
    /// starts. Without an explicit id a new conversation is started.
    pub async fn begin(&mut self, conversation_id: Option<&str>) -> Result<()> {
        match conversation_id {
            Some(conversation_id) => {
                self.session.select(conversation_id, None).await?;
                self.tx.send(Action::LoadConversation(
                    conversation_id.to_string(),
                    self.chat.approach,
                ))?;
            }
            None => {
                self.session.new_conversation().await?;
            }
        }

        return Ok(());
    }

    /// Handles one line typed by the user.
    pub async fn handle_line(&mut self, line: &str, out: &mut String) -> Result<Step> {
        let text = line.trim();
        if text.is_empty() {
            return Ok(self.step());
        }

        let command = match SlashCommand::parse(text) {
            Some(command) => command,
            None => {
                if self.chat.is_waiting() {
                    out.push_str("Still waiting on the previous answer. Start a new conversation with /new to stop it.\n");
                    return Ok(Step::Wait);
                }

                self.send_request(Some(text), out)?;
                return Ok(self.step());
            }
        };

        if command.is_quit() {
            return Ok(Step::Quit);
        }

        if command.is_help() {
            let _ = writeln!(out, "{}", help_text());
        } else if command.is_new() {
            self.abort_answer()?;
            self.session.new_conversation().await?;
            self.chat.reset();
            out.push_str("Started a new conversation.\n");
        } else if command.is_history() {
            let groups = group_conversations(
                &self.history,
                now_in(&self.offset).date_naive(),
                &self.order,
            );
            let res = format_history(&groups, &self.permitted_approaches());
            if res.is_empty() {
                out.push_str("There are no conversations yet. You should start your first one!\n");
            } else {
                let _ = writeln!(out, "{res}");
            }
        } else if command.is_open() {
            match command.first_arg() {
                Some(conversation_id) => {
                    let conversation_id = conversation_id.to_string();
                    self.open(&conversation_id, out).await?;
                }
                None => {
                    out.push_str("Usage: /open CONVERSATION_ID\n");
                }
            }
        } else if command.is_delete() {
            if !self.role.can_delete() {
                out.push_str(&format_error("Only lecturers can delete conversations.\n"));
            } else if let Some(conversation_id) = command.first_arg() {
                self.tx
                    .send(Action::DeleteConversation(conversation_id.to_string()))?;
                let _ = writeln!(out, "Deleting {conversation_id}...");
            } else {
                out.push_str("Usage: /delete CONVERSATION_ID\n");
            }
        } else if command.is_retry() {
            if self.chat.is_waiting() {
                out.push_str("Still waiting on the previous answer.\n");
                return Ok(Step::Wait);
            }
            self.send_request(None, out)?;
        } else if command.is_cite() {
            let number = command
                .first_arg()
                .and_then(|e| return e.parse::<usize>().ok())
                .unwrap_or(0);
            match self.chat.citation_link(&self.api_url, number) {
                Some(link) => {
                    let _ = writeln!(out, "{link}");
                }
                None => {
                    let _ = writeln!(out, "The last answer has no citation [{number}].");
                }
            }
        }

        return Ok(self.step());
    }

    /// Applies an event reported by the actions service.
    pub async fn handle_event(&mut self, event: Event, out: &mut String) -> Result<Step> {
        match event {
            Event::AnswerFragment(conversation_id, text) => {
                if let Some(text) = self.chat.handle_fragment(&conversation_id, &text) {
                    out.push_str(&text);
                }
                return Ok(Step::Wait);
            }
            Event::AnswerDone(conversation_id, answer) => {
                let rendered = match self.chat.handle_done(&conversation_id, &answer) {
                    Some(rendered) => rendered,
                    None => return Ok(self.step()),
                };

                out.push('\n');
                if answer.is_error() {
                    out.push_str(&format_error(&format!("{rendered}\n")));
                    return Ok(Step::Prompt);
                }

                if !self.chat.citations.is_empty() {
                    out.push_str("\nSources:\n");
                    for (idx, citation) in self.chat.citations.iter().enumerate() {
                        let _ = writeln!(out, "  [{}] {citation}", idx + 1);
                    }
                }
                if !self.chat.followup_questions.is_empty() {
                    out.push_str("\nFollow-up questions:\n");
                    for question in &self.chat.followup_questions {
                        let _ = writeln!(out, "  - {question}");
                    }
                }

                return Ok(Step::Prompt);
            }
            Event::AnswerFailed(conversation_id, message) => {
                if let Some(text) = self.chat.handle_failed(&conversation_id, &message) {
                    out.push_str(&format_error(&format!("\n{text}\n")));
                    return Ok(Step::Prompt);
                }
                return Ok(self.step());
            }
            Event::BackendMessage(msg) => {
                if msg.message_type() == MessageType::Error {
                    out.push_str(&format_error(&format!("{}\n", msg.text)));
                } else {
                    let _ = writeln!(out, "{}", msg.text);
                }
                return Ok(self.step());
            }
            Event::ConversationDeleted(conversation_id) => {
                let _ = writeln!(out, "Deleted conversation {conversation_id}.");
                if conversation_id == self.session.conversation_id() {
                    self.abort_answer()?;
                    self.session.new_conversation().await?;
                    self.chat.reset();
                    out.push_str("Started a new conversation.\n");
                }
                return Ok(self.step());
            }
            Event::ConversationLoaded(content) => {
                if content.conversation_id != self.session.conversation_id() {
                    tracing::debug!(
                        conversation_id = content.conversation_id,
                        "Discarding a conversation that is no longer selected"
                    );
                    return Ok(Step::Wait);
                }

                if content.approach != self.chat.approach {
                    self.chat = ChatState::new(content.approach);
                }
                if content.turns.is_empty() {
                    out.push_str("This conversation has no messages yet.\n");
                } else {
                    let _ = writeln!(out, "{}", format_turns(&content.turns, content.approach));
                }
                self.chat.load(content);

                return Ok(self.step());
            }
            Event::HistoryUpdated(conversations) => {
                self.history = conversations;
                return Ok(Step::Wait);
            }
        }
    }
}

fn print_out(out: &mut String) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    stdout.write_all(out.as_bytes())?;
    stdout.flush()?;
    out.clear();

    return Ok(());
}

fn print_prompt(repl: &Repl) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(
        stdout,
        "\n{}",
        repl.prompt()
            .if_supports_color(Stream::Stdout, |e| return e.bold())
    )?;
    stdout.flush()?;

    return Ok(());
}

/// Runs the interactive conversation until the user quits or stdin closes.
pub async fn start(approach: Approach) -> Result<()> {
    let (backend, identity) = cli::connect().await?;

    let mut approach = approach;
    if !identity.role().can_use(approach) {
        println!(
            "{} can only use the training document FAQ, switching to docsearch.",
            identity.role()
        );
        approach = Approach::DocSearch;
    }

    let store: SessionStoreBox = match FileStore::from_cache_dir() {
        Ok(store) => Box::new(store),
        Err(err) => {
            tracing::warn!(error = ?err, "Cache directory unavailable, the session will not be saved");
            Box::<MemoryStore>::default()
        }
    };
    let session = SessionContext::restore(store).await?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let login_user = identity.display_name.to_string();
    let worker = tokio::spawn(async move {
        return ActionsService::start(backend, &login_user, event_tx, &mut action_rx).await;
    });

    let mut repl = Repl::new(approach, &identity, session, action_tx.clone())?;
    let mut out = String::new();

    let conversation_id = Config::get(ConfigKey::ConversationID);
    repl.begin(Some(conversation_id.as_str()).filter(|e| return !e.is_empty()))
        .await?;
    action_tx.send(Action::RefreshHistory())?;

    tracing::info!(
        approach = %repl.approach(),
        conversation_id = repl.conversation_id(),
        "Conversation started"
    );

    let _ = writeln!(
        out,
        "Signed in as {} ({}). Type /help for commands.",
        identity.display_name,
        identity.role()
    );
    print_out(&mut out)?;
    print_prompt(&repl)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let step = tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => repl.handle_line(&line, &mut out).await?,
                    None => Step::Quit,
                }
            }
            event = event_rx.recv() => {
                match event {
                    Some(event) => repl.handle_event(event, &mut out).await?,
                    None => Step::Quit,
                }
            }
        };

        print_out(&mut out)?;
        match step {
            Step::Quit => break,
            Step::Prompt => print_prompt(&repl)?,
            Step::Wait => {}
        }
    }

    if repl.chat.is_waiting() {
        action_tx.send(Action::BackendAbort())?;
    }
    drop(action_tx);
    drop(repl);
    worker.await??;

    return Ok(());
}
