//! Server settings.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://tgstore.db".to_string()
}

fn default_janitor_interval_secs() -> u64 {
    5 * 60
}

fn default_janitor_max_age_secs() -> u64 {
    60 * 60
}

/// Settings loaded from config files and the environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Expected `Authorization` header value; unset disables the check.
    pub api_key: Option<String>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite URL, or `memory` for a process-local store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Chat every upload is posted to.
    pub telegram_chat_id: Option<i64>,
    /// Chat used to re-read messages on download; defaults to the upload chat.
    pub telegram_temp_chat_id: Option<i64>,

    /// Primary credentials: JSON array or comma/semicolon/whitespace separated.
    #[serde(rename = "bot_tokens")]
    pub bot_tokens_str: Option<String>,
    pub bot_api_url: Option<String>,

    /// Secondary credentials, same format as `bot_tokens`.
    #[serde(rename = "user_tokens")]
    pub user_tokens_str: Option<String>,
    pub user_api_url: Option<String>,
    #[serde(default)]
    pub user_api_local: bool,

    pub primary_max_upload_bytes: Option<u64>,
    pub body_limit_bytes: Option<u64>,

    /// Working directory of a local Bot API server, swept by the janitor.
    pub local_files_dir: Option<PathBuf>,
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
    #[serde(default = "default_janitor_max_age_secs")]
    pub janitor_max_age_secs: u64,
}

impl Settings {
    /// Load `config/default`, `config/{RUN_MODE}`, `config/local`, then the
    /// environment (`APP__` prefixed or bare).
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .add_source(Environment::default().ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    pub fn bot_tokens(&self) -> Vec<String> {
        self.bot_tokens_str.as_deref().map(parse_token_list).unwrap_or_default()
    }

    pub fn user_tokens(&self) -> Vec<String> {
        self.user_tokens_str.as_deref().map(parse_token_list).unwrap_or_default()
    }

    pub fn temp_chat_id(&self) -> Option<i64> {
        self.telegram_temp_chat_id.or(self.telegram_chat_id)
    }
}

/// Parse a credential list given as a JSON array or a separated string.
pub fn parse_token_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(tokens) = serde_json::from_str::<Vec<String>>(trimmed) {
            return tokens
                .into_iter()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect();
        }
    }

    trimmed
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            api_key: None,
            bind_addr: default_bind_addr(),
            database_url: default_database_url(),
            telegram_chat_id: Some(-100),
            telegram_temp_chat_id: None,
            bot_tokens_str: None,
            bot_api_url: None,
            user_tokens_str: None,
            user_api_url: None,
            user_api_local: false,
            primary_max_upload_bytes: None,
            body_limit_bytes: None,
            local_files_dir: None,
            janitor_interval_secs: default_janitor_interval_secs(),
            janitor_max_age_secs: default_janitor_max_age_secs(),
        }
    }

    #[test]
    fn token_list_accepts_json_array() {
        assert_eq!(parse_token_list(r#"["123:abc", "456:def"]"#), vec!["123:abc", "456:def"]);
    }

    #[test]
    fn token_list_accepts_separators() {
        assert_eq!(parse_token_list("1:a,2:b; 3:c\n4:d"), vec!["1:a", "2:b", "3:c", "4:d"]);
        assert!(parse_token_list("  ").is_empty());
    }

    #[test]
    fn temp_chat_defaults_to_upload_chat() {
        let mut s = settings();
        assert_eq!(s.temp_chat_id(), Some(-100));

        s.telegram_temp_chat_id = Some(-200);
        assert_eq!(s.temp_chat_id(), Some(-200));
    }

    #[test]
    fn missing_token_lists_are_empty() {
        let mut s = settings();
        assert!(s.bot_tokens().is_empty());

        s.user_tokens_str = Some("u1 u2".to_string());
        assert_eq!(s.user_tokens().len(), 2);
    }
}
