#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use owo_colors::OwoColorize;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::repl::format_history;
use super::repl::format_turns;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::now_in;
use crate::domain::models::parse_utc_offset;
use crate::domain::models::Approach;
use crate::domain::models::BackendBox;
use crate::domain::models::ConversationSummary;
use crate::domain::models::Identity;
use crate::domain::models::Role;
use crate::domain::services::actions::help_text;
use crate::domain::services::group_conversations;
use crate::domain::services::resolve_identity;
use crate::domain::services::GroupOrder;
use crate::infrastructure::backends::BackendManager;

const GPT_MODELS: [&str; 6] = [
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-4",
    "gpt-4-32k",
    "gpt-4o-mini",
    "gpt-4o",
];

const TEMPERATURES: [&str; 11] = [
    "0.0", "0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8", "0.9", "1.0",
];

pub const NO_PERMISSION_MESSAGE: &str =
    "You do not have permission to use docfaq. Ask an administrator to grant you the Lecturer or Student role.";

/// The signed in user holds neither the Lecturer nor the Student role.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", NO_PERMISSION_MESSAGE)]
pub struct NoPermission;

fn ensure_access(identity: &Identity) -> Result<()> {
    if identity.role() == Role::NoAccess {
        return Err(NoPermission.into());
    }

    return Ok(());
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

/// Connects to the backend and resolves the signed in user. Users without a
/// role are turned away here.
pub async fn connect() -> Result<(BackendBox, Identity)> {
    let backend = BackendManager::get()?;
    backend.health_check().await?;

    let identity = resolve_identity(&backend, &Config::get(ConfigKey::AccessToken)).await?;
    ensure_access(&identity)?;

    return Ok((backend, identity));
}

/// Finds a conversation in the user's history. Its approach decides which
/// endpoint loads and continues it.
async fn lookup_conversation(
    backend: &BackendBox,
    identity: &Identity,
    conversation_id: &str,
) -> Result<ConversationSummary> {
    let summary = match backend
        .list_conversations(&identity.display_name)
        .await?
        .into_iter()
        .find(|e| return e.conversation_id == conversation_id)
    {
        Some(summary) => summary,
        None => bail!(format!("Unknown conversation {conversation_id}")),
    };

    if !identity.role().can_use(summary.approach) {
        bail!(format!(
            "Your role cannot open {} conversations",
            summary.approach
        ));
    }

    return Ok(summary);
}

fn permitted_approaches(role: Role, only: Option<Approach>) -> Vec<Approach> {
    return [Approach::Chat, Approach::DocSearch]
        .into_iter()
        .filter(|approach| {
            return role.can_use(*approach) && only.map_or(true, |e| return e == *approach);
        })
        .collect::<Vec<Approach>>();
}

fn approach_arg(matches: &clap::ArgMatches) -> Option<Approach> {
    return matches
        .get_one::<String>("approach")
        .and_then(|e| return Approach::parse(e));
}

async fn print_history_list(only: Option<Approach>) -> Result<()> {
    let (backend, identity) = connect().await?;
    let conversations = backend.list_conversations(&identity.display_name).await?;

    let offset = parse_utc_offset(&Config::get(ConfigKey::UtcOffset))?;
    let groups = group_conversations(
        &conversations,
        now_in(&offset).date_naive(),
        &GroupOrder::from_config()?,
    );

    let approaches = permitted_approaches(identity.role(), only);
    let res = format_history(&groups, &approaches);
    if res.is_empty() {
        println!("There are no conversations yet. You should start your first one!");
    } else {
        println!("{res}");
    }

    return Ok(());
}

async fn print_conversation(conversation_id: &str) -> Result<()> {
    let (backend, identity) = connect().await?;
    let summary = lookup_conversation(&backend, &identity, conversation_id).await?;

    let content = backend
        .conversation_content(conversation_id, summary.approach)
        .await?;
    if content.turns.is_empty() {
        println!("Conversation {conversation_id} has no messages.");
    } else {
        println!("{}", format_turns(&content.turns, summary.approach));
    }

    return Ok(());
}

async fn delete_conversation(conversation_id: &str) -> Result<()> {
    let (backend, identity) = connect().await?;
    if !identity.role().can_delete() {
        bail!("Only lecturers can delete conversations");
    }

    if !backend.delete_conversation(conversation_id).await? {
        bail!(format!("Conversation {conversation_id} could not be deleted"));
    }

    println!("Deleted conversation {conversation_id}");
    return Ok(());
}

fn format_option(summary: &ConversationSummary) -> String {
    let mut line = summary.title.to_string();
    if line.chars().count() >= 70 {
        line = format!("{}...", line.chars().take(67).collect::<String>());
    }

    return format!("[{}] {line} (ID: {})", summary.approach, summary.conversation_id);
}

/// Lets the user pick a conversation to continue. Returns the approach the
/// picked conversation belongs to.
async fn open_conversation_interactive(only: Option<Approach>) -> Result<Option<Approach>> {
    let (backend, identity) = connect().await?;
    let approaches = permitted_approaches(identity.role(), only);
    let mut conversations = backend
        .list_conversations(&identity.display_name)
        .await?
        .into_iter()
        .filter(|e| return approaches.contains(&e.approach))
        .collect::<Vec<ConversationSummary>>();

    if conversations.is_empty() {
        println!("There are no conversations yet. You should start your first one!");
        return Ok(None);
    }

    conversations.sort_by(|a, b| return b.timestamp_token.cmp(&a.timestamp_token));
    let options = conversations
        .iter()
        .map(format_option)
        .collect::<Vec<String>>();

    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which conversation would you like to open?")
        .default(0)
        .items(&options)
        .interact_opt()?;

    if let Some(idx) = selected {
        let conversation = &conversations[idx];
        Config::set(ConfigKey::ConversationID, &conversation.conversation_id);
        return Ok(Some(conversation.approach));
    }

    return Ok(None);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for docfaq")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running docfaq with environment variable RUST_LOG=docfaq")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn arg_approach() -> Arg {
    return Arg::new("approach")
        .short('a')
        .long("approach")
        .num_args(1)
        .help("Only include conversations of this approach.")
        .value_parser(PossibleValuesParser::new(Approach::VARIANTS));
}

fn arg_conversation_id(required: bool) -> Arg {
    return Arg::new(ConfigKey::ConversationID.to_string())
        .short('i')
        .long("id")
        .num_args(1)
        .help("Conversation ID")
        .required(required);
}

fn subcommand_history() -> Command {
    return Command::new("history")
        .about("Browse and manage your past conversations.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List your conversations grouped by date.")
                .arg(arg_approach()),
        )
        .subcommand(
            Command::new("show")
                .about("Print every question and answer of a conversation.")
                .arg(arg_conversation_id(true)),
        )
        .subcommand(
            Command::new("open")
                .about("Continue a past conversation. Omit passing a conversation ID to load an interactive selection.")
                .arg(arg_conversation_id(false))
                .arg(arg_approach()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a conversation. Lecturers only.")
                .arg(arg_conversation_id(true)),
        );
}

fn arg_global(key: ConfigKey, env: &'static str, help: &str) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env)
        .num_args(1)
        .help(help.to_string())
        .global(true);
}

fn with_default(help: &str, key: ConfigKey) -> String {
    return format!("{help} [default: {}]", Config::default(key));
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") || line.starts_with("HOTKEYS:") {
                return format!("CHAT {line}").underline().bold().to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nBuilt: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_BUILD_DATE")
    );

    return Command::new("docfaq")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start a general chat conversation. Lecturers only."))
        .subcommand(Command::new("docsearch").about("Ask questions about the training documents."))
        .subcommand(subcommand_history())
        .subcommand(Command::new("whoami").about("Print the signed in user and their role."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(
            arg_global(ConfigKey::ConfigFile, "DOCFAQ_CONFIG_FILE", &with_default("Path to configuration file", ConfigKey::ConfigFile))
                .short('c')
        )
        .arg(
            arg_global(ConfigKey::ApiURL, "DOCFAQ_API_URL", &with_default("Document FAQ API URL.", ConfigKey::ApiURL))
                .short('u')
        )
        .arg(arg_global(
            ConfigKey::AccessToken,
            "DOCFAQ_ACCESS_TOKEN",
            "Access token used to look up your identity and roles. When unset, username and roles are read from config.",
        ))
        .arg(arg_global(
            ConfigKey::Username,
            "DOCFAQ_USERNAME",
            "Login user sent to the backend when no access token is set.",
        ))
        .arg(arg_global(
            ConfigKey::Roles,
            "DOCFAQ_ROLES",
            "Role claim used when no access token is set, for example Lecturer or Student.",
        ))
        .arg(
            arg_global(ConfigKey::GptModel, "DOCFAQ_GPT_MODEL", &with_default("Model used to answer questions.", ConfigKey::GptModel))
                .short('m')
                .value_parser(PossibleValuesParser::new(GPT_MODELS))
        )
        .arg(
            arg_global(ConfigKey::Temperature, "DOCFAQ_TEMPERATURE", &with_default("Sampling temperature of the model.", ConfigKey::Temperature))
                .value_parser(PossibleValuesParser::new(TEMPERATURES))
        )
        .arg(arg_global(
            ConfigKey::SystemPrompt,
            "DOCFAQ_SYSTEM_PROMPT",
            "System prompt for chat conversations.",
        ))
        .arg(arg_global(
            ConfigKey::RetrieveCount,
            "DOCFAQ_RETRIEVE_COUNT",
            &with_default("Number of document passages retrieved for each docsearch question.", ConfigKey::RetrieveCount),
        ))
        .arg(arg_global(
            ConfigKey::ExcludeCategory,
            "DOCFAQ_EXCLUDE_CATEGORY",
            "Document category excluded from docsearch retrieval.",
        ))
        .arg(
            arg_global(ConfigKey::SemanticRanker, "DOCFAQ_SEMANTIC_RANKER", &with_default("Use the semantic ranker for docsearch retrieval.", ConfigKey::SemanticRanker))
                .value_parser(PossibleValuesParser::new(["true", "false"]))
        )
        .arg(
            arg_global(ConfigKey::SemanticCaptions, "DOCFAQ_SEMANTIC_CAPTIONS", &with_default("Use semantic captions instead of whole passages for docsearch retrieval.", ConfigKey::SemanticCaptions))
                .value_parser(PossibleValuesParser::new(["true", "false"]))
        )
        .arg(arg_global(
            ConfigKey::UtcOffset,
            "DOCFAQ_UTC_OFFSET",
            &with_default("UTC offset of conversation timestamps, such as +09:00.", ConfigKey::UtcOffset),
        ))
        .arg(arg_global(
            ConfigKey::HistoryAnchorYear,
            "DOCFAQ_HISTORY_ANCHOR_YEAR",
            &with_default("Newest year shown as its own history group.", ConfigKey::HistoryAnchorYear),
        ))
        .arg(arg_global(
            ConfigKey::HistoryOldestYear,
            "DOCFAQ_HISTORY_OLDEST_YEAR",
            &with_default("Oldest year shown as its own history group. Older conversations are hidden.", ConfigKey::HistoryOldestYear),
        ))
        .arg(arg_global(
            ConfigKey::HealthCheckTimeout,
            "DOCFAQ_HEALTH_CHECK_TIMEOUT",
            &with_default("Time to wait in milliseconds before timing out when doing a healthcheck for the API.", ConfigKey::HealthCheckTimeout),
        ));
}

/// Parses arguments and loads config. Returns the approach to start an
/// interactive conversation with, or `None` when the command already ran.
pub async fn parse() -> Result<Option<Approach>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = Config::cache_dir().join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(None);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Approach::Chat));
        }
        Some(("docsearch", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Approach::DocSearch));
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        Some(("whoami", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let backend = BackendManager::get()?;
            let identity =
                resolve_identity(&backend, &Config::get(ConfigKey::AccessToken)).await?;
            println!("{} ({})", identity.display_name, identity.role());
            return Ok(None);
        }
        Some(("history", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("list", list_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, list_matches]).await?;
                print_history_list(approach_arg(list_matches)).await?;
                return Ok(None);
            }
            Some(("show", show_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, show_matches]).await?;
                print_conversation(&Config::get(ConfigKey::ConversationID)).await?;
                return Ok(None);
            }
            Some(("open", open_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, open_matches]).await?;
                let conversation_id = Config::get(ConfigKey::ConversationID);
                if conversation_id.is_empty() {
                    return open_conversation_interactive(approach_arg(open_matches)).await;
                }

                let (backend, identity) = connect().await?;
                let summary = lookup_conversation(&backend, &identity, &conversation_id).await?;
                return Ok(Some(summary.approach));
            }
            Some(("delete", delete_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, delete_matches]).await?;
                delete_conversation(&Config::get(ConfigKey::ConversationID)).await?;
                return Ok(None);
            }
            _ => {
                subcommand_history().print_long_help()?;
                return Ok(None);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(Some(Approach::Chat));
}
