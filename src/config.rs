use crate::engine::evaluator::{CheckRule, Condition};
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

const ENV_FILE: &str = ".env";
pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";

/// Config path argument that means "read from standard input".
pub const STDIN_SOURCE: &str = "-";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram accepts either a numeric chat id or an `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub poll_interval: Duration,
    pub rules: Vec<CheckRule>,
    pub chat_id: ChatId,
    pub debug: bool,
    pub notify_on_start: bool,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
    pub telegram_api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(alias = "url")]
    target_url: String,
    #[serde(alias = "poll_interval")]
    poll_interval_seconds: f64,
    search_queries: Vec<RawQuery>,
    chat_id: ChatId,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    init_notification: bool,
    request_timeout_ms: Option<u64>,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default = "default_telegram_api_base")]
    telegram_api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    selector: String,
    contains: Option<String>,
    not_contains: Option<String>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

impl RawQuery {
    fn into_rule(self, index: usize) -> Result<CheckRule> {
        let condition = match (self.contains, self.not_contains) {
            (Some(text), None) => Condition::Contains(text),
            (None, Some(text)) => Condition::NotContains(text),
            (Some(_), Some(_)) => {
                return Err(MonitorError::config(format!(
                    "search_queries[{}] ({}): set only one of `contains` or `not_contains`",
                    index, self.selector
                )))
            }
            (None, None) => {
                return Err(MonitorError::config(format!(
                    "search_queries[{}] ({}): one of `contains` or `not_contains` is required",
                    index, self.selector
                )))
            }
        };
        if condition.text().is_empty() {
            return Err(MonitorError::config(format!(
                "search_queries[{}] ({}): condition text cannot be empty",
                index, self.selector
            )));
        }
        CheckRule::new(&self.selector, condition).map_err(|e| match e {
            MonitorError::Config { details } => {
                MonitorError::config(format!("search_queries[{}]: {}", index, details))
            }
            other => other,
        })
    }
}

impl Config {
    /// Load from a file path, or from stdin when `source` is `-`.
    pub fn load_from(source: &str) -> Result<Self> {
        Self::load_from_with(source, std::io::stdin().lock())
    }

    /// Like `load_from`, reading `stdin` instead of the process stdin.
    pub fn load_from_with<R: Read>(source: &str, stdin: R) -> Result<Self> {
        if source == STDIN_SOURCE {
            Self::load_from_reader(stdin)
        } else {
            Self::load(Path::new(source))
        }
    }

    pub fn load_from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| MonitorError::config(format!("failed to read config from stdin: {}", e)))?;
        Self::from_toml_str(&content)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| MonitorError::config(format!("failed to parse config TOML: {}", e)))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let url = reqwest::Url::parse(&raw.target_url)
            .map_err(|e| MonitorError::config(format!("target_url {:?}: {}", raw.target_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MonitorError::config(format!(
                "target_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if !raw.poll_interval_seconds.is_finite() || raw.poll_interval_seconds <= 0.0 {
            return Err(MonitorError::config(format!(
                "poll_interval_seconds must be a positive number, got {}",
                raw.poll_interval_seconds
            )));
        }
        let poll_interval = Duration::try_from_secs_f64(raw.poll_interval_seconds).map_err(|e| {
            MonitorError::config(format!(
                "poll_interval_seconds {}: {}",
                raw.poll_interval_seconds, e
            ))
        })?;

        let rules = raw
            .search_queries
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.into_rule(i))
            .collect::<Result<Vec<_>>>()?;

        if let ChatId::Username(name) = &raw.chat_id {
            if name.trim().is_empty() {
                return Err(MonitorError::config("chat_id cannot be empty"));
            }
        }

        Ok(Config {
            target_url: raw.target_url,
            poll_interval,
            rules,
            chat_id: raw.chat_id,
            debug: raw.debug,
            notify_on_start: raw.init_notification,
            request_timeout: raw.request_timeout_ms.map(Duration::from_millis),
            user_agent: raw.user_agent,
            telegram_api_base: raw.telegram_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let content = match std::fs::read_to_string(ENV_FILE) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for (key, value) in parse_env_lines(content) {
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// Telegram bot token from the environment.
    pub fn bot_token() -> Result<String> {
        match std::env::var(BOT_TOKEN_VAR) {
            Ok(token) if !sanitize_key(&token).is_empty() => Ok(sanitize_key(&token)),
            _ => Err(MonitorError::config(format!(
                "environment variable {} is not set",
                BOT_TOKEN_VAR
            ))),
        }
    }
}

fn parse_env_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"').trim_matches('\'')))
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
