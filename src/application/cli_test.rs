use anyhow::Result;
use test_utils::conversation_list_fixture;

use super::ensure_access;
use super::lookup_conversation;
use super::NoPermission;
use super::NO_PERMISSION_MESSAGE;
use crate::domain::models::Approach;
use crate::domain::models::BackendBox;
use crate::domain::models::Identity;
use crate::infrastructure::backends::docfaq_api::DocFaqApi;

fn identity(roles: &str) -> Identity {
    return Identity {
        display_name: "user@example.com".to_string(),
        roles: roles.to_string(),
    };
}

async fn history_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(conversation_list_fixture())
        .create_async()
        .await;

    return server;
}

#[tokio::test]
async fn it_opens_conversations_with_their_own_approach() -> Result<()> {
    let server = history_server().await;
    let backend: BackendBox = Box::new(DocFaqApi::new(&server.url(), "200"));

    let chat = lookup_conversation(&backend, &identity("Lecturer"), "c-1").await?;
    assert_eq!(chat.approach, Approach::Chat);

    let docsearch = lookup_conversation(&backend, &identity("Lecturer"), "c-2").await?;
    assert_eq!(docsearch.approach, Approach::DocSearch);

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_open_unknown_conversations() {
    let server = history_server().await;
    let backend: BackendBox = Box::new(DocFaqApi::new(&server.url(), "200"));

    let err = lookup_conversation(&backend, &identity("Lecturer"), "c-404")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unknown conversation c-404");
}

#[tokio::test]
async fn it_keeps_students_out_of_chat_conversations() {
    let server = history_server().await;
    let backend: BackendBox = Box::new(DocFaqApi::new(&server.url(), "200"));

    let err = lookup_conversation(&backend, &identity("Student"), "c-1")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Your role cannot open chat conversations");
}

#[test]
fn it_turns_away_users_without_a_role() {
    let err = ensure_access(&identity("Guest")).unwrap_err();

    assert_eq!(err.downcast_ref::<NoPermission>(), Some(&NoPermission));
    assert_eq!(err.to_string(), NO_PERMISSION_MESSAGE);
    assert!(ensure_access(&identity("Student")).is_ok());
}
