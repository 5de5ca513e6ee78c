use anyhow::Result;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::TimeZone;

use super::ChatState;
use crate::configuration::Config;
use crate::domain::models::Approach;
use crate::domain::models::AssembledAnswer;
use crate::domain::models::ChatTurn;
use crate::domain::models::ConversationContent;
use crate::domain::models::Overrides;
use crate::domain::models::END_OF_RESPONSE;
use crate::domain::services::SessionContext;
use crate::infrastructure::stores::MemoryStore;

fn now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    return offset
        .with_ymd_and_hms(2024, 10, 2, 10, 0, 0)
        .single()
        .unwrap();
}

async fn session(conversation_id: &str) -> Result<SessionContext> {
    Config::set_defaults();
    return SessionContext::restore(Box::new(MemoryStore::with_id(conversation_id))).await;
}

#[tokio::test]
async fn it_builds_requests_with_completed_history() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);
    state.turns = vec![ChatTurn::answered("Hi", "Hello!")];

    let req = state.build_request("What is due?", &mut session, &now(), "student@example.com")?;

    assert_eq!(
        req.history,
        vec![
            ChatTurn::answered("Hi", "Hello!"),
            ChatTurn::pending("What is due?"),
        ]
    );
    assert_eq!(req.approach(), Approach::Chat);
    assert!(matches!(req.overrides, Overrides::Chat(_)));
    assert_eq!(req.conversation_id, "conv-1");
    assert_eq!(req.timestamp, "20241002100000");
    assert_eq!(req.login_user, "student@example.com");
    assert!(state.is_waiting());

    return Ok(());
}

#[tokio::test]
async fn it_refuses_a_second_request_while_waiting() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);

    state.build_request("First", &mut session, &now(), "user")?;
    let res = state.build_request("Second", &mut session, &now(), "user");

    assert!(res.is_err());

    return Ok(());
}

#[tokio::test]
async fn it_streams_fragments_and_records_the_answer() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::DocSearch);
    state.build_request("Deadline?", &mut session, &now(), "user")?;

    assert_eq!(state.handle_fragment("conv-1", "Friday "), Some("Friday ".to_string()));
    assert_eq!(state.handle_fragment("conv-1", "[a/b.pdf]"), Some("[a/b.pdf]".to_string()));
    assert_eq!(state.handle_fragment("conv-1", END_OF_RESPONSE), None);
    assert_eq!(state.stream_buffer, "Friday [a/b.pdf]");

    let rendered = state.handle_done("conv-1", &AssembledAnswer::new("Friday [a/b.pdf]"));

    assert_eq!(rendered, Some("Friday [1]".to_string()));
    assert_eq!(state.citations, vec!["b.pdf".to_string()]);
    assert_eq!(state.turns, vec![ChatTurn::answered("Deadline?", "Friday [a/b.pdf]")]);
    assert_eq!(state.stream_buffer, "");
    assert!(!state.is_waiting());
    assert_eq!(
        state.citation_link("http://localhost:5000", 1),
        Some("http://localhost:5000/content/b.pdf#view=FitV&pagemode=none&toolbar=0".to_string())
    );
    assert_eq!(state.citation_link("http://localhost:5000", 2), None);
    assert_eq!(state.citation_link("http://localhost:5000", 0), None);

    return Ok(());
}

#[tokio::test]
async fn it_resets_the_buffer_on_empty_fragments() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);
    state.build_request("Question", &mut session, &now(), "user")?;

    state.handle_fragment("conv-1", "partial");
    state.handle_fragment("conv-1", "");

    assert_eq!(state.stream_buffer, "");

    return Ok(());
}

#[tokio::test]
async fn it_discards_events_for_stale_conversations() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);
    state.build_request("Question", &mut session, &now(), "user")?;

    assert_eq!(state.handle_fragment("conv-2", "late"), None);
    assert_eq!(state.handle_done("conv-2", &AssembledAnswer::new("late")), None);
    assert!(state.turns.is_empty());

    state.abort();
    assert_eq!(state.handle_fragment("conv-1", "after abort"), None);
    assert!(state.turns.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_keeps_the_question_after_a_failure_for_retry() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);
    state.build_request("Question", &mut session, &now(), "user")?;

    let shown = state.handle_failed("conv-1", "Service unavailable");
    assert!(shown.unwrap().contains("Service unavailable"));
    assert!(state.turns.is_empty());

    let retry = state
        .build_retry_request(&mut session, &now(), "user")?
        .unwrap();
    assert_eq!(retry.history, vec![ChatTurn::pending("Question")]);

    return Ok(());
}

#[tokio::test]
async fn it_replaces_an_answered_question_on_retry() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);
    state.build_request("Question", &mut session, &now(), "user")?;
    state.handle_done("conv-1", &AssembledAnswer::new("[Old] answer"));

    let retry = state
        .build_retry_request(&mut session, &now(), "user")?
        .unwrap();

    assert!(state.turns.is_empty());
    assert_eq!(retry.history, vec![ChatTurn::pending("Question")]);

    return Ok(());
}

#[tokio::test]
async fn it_has_nothing_to_retry_without_a_question() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::Chat);

    assert!(state
        .build_retry_request(&mut session, &now(), "user")?
        .is_none());

    return Ok(());
}

#[tokio::test]
async fn it_shows_error_answers_verbatim() -> Result<()> {
    let mut session = session("conv-1").await?;
    let mut state = ChatState::new(Approach::DocSearch);
    state.build_request("Question", &mut session, &now(), "user")?;

    let answer = AssembledAnswer::token_limit_exceeded();
    let shown = state.handle_done("conv-1", &answer);

    assert_eq!(shown, Some(answer.text));
    assert!(state.citations.is_empty());

    return Ok(());
}

#[test]
fn it_loads_conversations_wholesale() {
    let mut state = ChatState::new(Approach::Chat);
    state.turns = vec![ChatTurn::answered("Old", "Old answer")];

    state.load(ConversationContent {
        conversation_id: "conv-9".to_string(),
        approach: Approach::Chat,
        turns: vec![
            ChatTurn::answered("One", "1"),
            ChatTurn::answered("Two", "2"),
        ],
    });

    assert_eq!(state.turns.len(), 2);
    assert_eq!(state.last_question, Some("Two".to_string()));
    assert!(!state.is_waiting());
}
