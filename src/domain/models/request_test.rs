use anyhow::Result;

use super::AnswerRequest;
use super::ChatOverrides;
use super::Overrides;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Approach;
use crate::domain::models::ChatTurn;

fn chat_overrides() -> Overrides {
    return Overrides::Chat(ChatOverrides {
        gpt_model: "gpt-4o".to_string(),
        temperature: "0.0".to_string(),
        system_prompt: "".to_string(),
    });
}

#[test]
fn it_derives_approach_from_overrides() {
    let request = AnswerRequest {
        history: vec![ChatTurn::pending("Hello")],
        overrides: chat_overrides(),
        conversation_id: "abc".to_string(),
        timestamp: "20241002100000".to_string(),
        conversation_title: None,
        login_user: "user".to_string(),
    };

    assert_eq!(request.approach(), Approach::Chat);
    assert_eq!(request.question(), "Hello");
}

#[test]
fn it_has_no_question_without_history() {
    let request = AnswerRequest {
        history: vec![],
        overrides: chat_overrides(),
        conversation_id: "abc".to_string(),
        timestamp: "20241002100000".to_string(),
        conversation_title: None,
        login_user: "user".to_string(),
    };

    assert_eq!(request.question(), "");
}

#[test]
fn it_builds_docsearch_overrides_from_config() -> Result<()> {
    for key in [
        ConfigKey::GptModel,
        ConfigKey::Temperature,
        ConfigKey::RetrieveCount,
        ConfigKey::ExcludeCategory,
        ConfigKey::SemanticRanker,
        ConfigKey::SemanticCaptions,
    ] {
        Config::set(key, &Config::default(key));
    }

    let overrides = Overrides::from_config(Approach::DocSearch)?;
    assert_eq!(overrides.approach(), Approach::DocSearch);
    match overrides {
        Overrides::DocSearch(docsearch) => {
            assert_eq!(docsearch.top, 5);
            assert_eq!(docsearch.exclude_category, None);
            assert!(docsearch.semantic_ranker);
            assert!(docsearch.semantic_captions);
        }
        Overrides::Chat(_) => panic!("expected docsearch overrides"),
    }

    return Ok(());
}
