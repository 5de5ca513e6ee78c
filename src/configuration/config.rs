#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    AccessToken,
    ApiURL,
    ConfigFile,
    ConversationID,
    ExcludeCategory,
    GptModel,
    HealthCheckTimeout,
    HistoryAnchorYear,
    HistoryOldestYear,
    RetrieveCount,
    Roles,
    SemanticCaptions,
    SemanticRanker,
    SystemPrompt,
    Temperature,
    Username,
    UtcOffset,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn set_defaults() {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key));
        }
    }

    pub fn config_dir() -> path::PathBuf {
        #[cfg(not(target_os = "macos"))]
        let config_dir = dirs::config_dir().unwrap_or_else(env::temp_dir);
        #[cfg(target_os = "macos")]
        let config_dir = dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".config");

        return config_dir.join("docfaq");
    }

    pub fn cache_dir() -> path::PathBuf {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("docfaq");
    }

    pub fn default(key: ConfigKey) -> String {
        if key == ConfigKey::Username {
            let mut user = env::var("USER").unwrap_or_else(|_| return "".to_string());
            if user.is_empty() {
                user = "User".to_string();
            }

            return user;
        }

        if key == ConfigKey::ConfigFile {
            return Config::config_dir()
                .join("config.toml")
                .to_string_lossy()
                .to_string();
        }

        let res = match key {
            ConfigKey::AccessToken => "",
            ConfigKey::ApiURL => "http://localhost:5000",
            ConfigKey::ExcludeCategory => "",
            ConfigKey::GptModel => "gpt-4o",
            ConfigKey::HealthCheckTimeout => "1000",
            ConfigKey::HistoryAnchorYear => "2029",
            ConfigKey::HistoryOldestYear => "2023",
            ConfigKey::RetrieveCount => "5",
            ConfigKey::Roles => "",
            ConfigKey::SemanticCaptions => "true",
            ConfigKey::SemanticRanker => "true",
            ConfigKey::SystemPrompt => "",
            ConfigKey::Temperature => "0.0",
            ConfigKey::UtcOffset => "+09:00",

            // Special
            ConfigKey::ConfigFile => "",
            ConfigKey::ConversationID => "",
            ConfigKey::Username => "",
        };

        return res.to_string();
    }

    fn possible_values(cmd: &Command, key: ConfigKey) -> Vec<String> {
        if let Some(arg) = cmd
            .get_arguments()
            .find(|e| return e.get_long() == Some(key.to_string().as_str()))
        {
            return arg
                .get_possible_values()
                .iter()
                .map(|e| return e.get_name().to_string())
                .collect::<Vec<String>>();
        }

        return vec![];
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        Config::set_defaults();

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile || key == ConfigKey::ConversationID {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    let val_str = if let Some(val_int) = val.as_integer() {
                        val_int.to_string()
                    } else if let Some(val_float) = val.as_float() {
                        format!("{val_float:.1}")
                    } else if let Some(val_bool) = val.as_bool() {
                        val_bool.to_string()
                    } else if let Some(val_str) = val.as_str() {
                        val_str.to_string()
                    } else {
                        bail!(format!("config.toml has an unsupported value type for key '{key}'"));
                    };

                    if val_str.is_empty() {
                        continue;
                    }

                    // Use clap value parsers to do validation.
                    let possible_values = Config::possible_values(&cmd, key);
                    if !possible_values.is_empty() && !possible_values.contains(&val_str) {
                        bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                    }

                    Config::set(key, &val_str);
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            username = Config::get(ConfigKey::Username),
            api_url = Config::get(ConfigKey::ApiURL),
            gpt_model = Config::get(ConfigKey::GptModel),
            temperature = Config::get(ConfigKey::Temperature),
            retrieve_count = Config::get(ConfigKey::RetrieveCount),
            utc_offset = Config::get(ConfigKey::UtcOffset),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConversationID || key == ConfigKey::ConfigFile {
                    return None;
                }

                if key == ConfigKey::Username {
                    return Some(
                        "# Name sent as the login user when no access token is set.\n# username = \"\""
                            .to_string(),
                    );
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|e| return e.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let possible_values = Config::possible_values(&cmd, key);
                if !possible_values.is_empty() {
                    description = format!(
                        "{description} [possible values: {}]",
                        possible_values.join(", ")
                    );
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i32>().is_ok() || val == "true" || val == "false" {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
