use anyhow::Result;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

#[test]
fn it_serializes_to_valid_toml() -> Result<()> {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>()?;

    assert_eq!(doc["api-url"].as_str(), Some("http://localhost:5000"));
    assert_eq!(doc["retrieve-count"].as_integer(), Some(5));
    assert_eq!(doc["semantic-ranker"].as_bool(), Some(true));
    assert!(doc.get("conversation-id").is_none());
    assert!(doc.get("config-file").is_none());
    assert!(res.contains("# access-token = \"\""));

    return Ok(());
}

#[tokio::test]
async fn it_loads_config_from_file() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec![
        "docfaq",
        "-c",
        "./config.example.toml",
        "chat",
    ])?;
    Config::load(cli::build(), vec![&matches]).await?;

    assert_eq!(Config::get(ConfigKey::GptModel), "gpt-4o");
    assert_eq!(Config::get(ConfigKey::Temperature), "0.0");
    assert_eq!(Config::get(ConfigKey::SemanticRanker), "true");
    assert_eq!(Config::get(ConfigKey::UtcOffset), "+09:00");

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_loads_config_from_file() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec![
        "docfaq",
        "-c",
        "./test/bad-config.toml",
        "chat",
    ])?;
    let res = Config::load(cli::build(), vec![&matches]).await;

    let err = res.unwrap_err();
    assert!(err.to_string().contains("semantic-ranker"));

    return Ok(());
}
