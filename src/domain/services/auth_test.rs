use anyhow::Result;

use super::resolve_identity;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendBox;
use crate::domain::models::Role;
use crate::infrastructure::backends::docfaq_api::DocFaqApi;

#[tokio::test]
async fn it_uses_the_user_info_endpoint_with_a_token() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/userinfo")
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_body(r#"{"name": "Aiko Tanaka", "roles": "Student"}"#)
        .create_async()
        .await;

    let backend: BackendBox = Box::new(DocFaqApi::new(&server.url(), "200"));
    let identity = resolve_identity(&backend, "token-1").await?;
    mock.assert_async().await;

    assert_eq!(identity.display_name, "Aiko Tanaka");
    assert_eq!(identity.role(), Role::Student);

    return Ok(());
}

#[tokio::test]
async fn it_falls_back_to_config_without_a_token() -> Result<()> {
    Config::set_defaults();
    let backend: BackendBox = Box::new(DocFaqApi::new("http://127.0.0.1:1", "200"));

    let identity = resolve_identity(&backend, "").await?;

    assert_eq!(identity.display_name, Config::get(ConfigKey::Username));
    assert_eq!(identity.role(), Role::NoAccess);

    return Ok(());
}
