use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

const RETRY_PERIOD_SECONDS: &str = "RETRY_PERIOD_SECONDS";
const REQUEST_TIMEOUT_SECONDS: &str = "REQUEST_TIMEOUT_SECONDS";
const PRACTICUM_ENDPOINT: &str = "PRACTICUM_ENDPOINT";
const LOG_DIR: &str = "LOG_DIR";

const REQUIRED_VARS: [&str; 3] = [PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID];

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
const DEFAULT_RETRY_PERIOD_SECONDS: u64 = 600;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Required environment variables are absent or empty.
    MissingVar(Vec<&'static str>),
    /// The chat id is not an integer.
    InvalidChatId(String),
    /// A numeric option could not be parsed.
    InvalidNumber { var: &'static str, value: String },
    /// Failed to read the env file.
    ReadEnvFile { path: PathBuf, source: dotenvy::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(names) => {
                write!(f, "missing required environment variable(s): {}", names.join(", "))
            }
            Self::InvalidChatId(value) => {
                write!(f, "{TELEGRAM_CHAT_ID} must be an integer, got '{value}'")
            }
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer, got '{value}'")
            }
            Self::ReadEnvFile { path, source } => {
                write!(f, "failed to read env file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadEnvFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub struct Config {
    /// OAuth token for the review API.
    pub practicum_token: String,
    pub telegram_token: String,
    /// Destination for every notification.
    pub chat_id: ChatId,
    pub endpoint: String,
    /// Sleep between poll cycles.
    pub retry_period: Duration,
    /// Upper bound on a single review API request.
    pub request_timeout: Duration,
    /// When set, logs are also appended to a file in this directory.
    pub log_dir: Option<PathBuf>,
}

/// Returns true only if every required credential is present and non-empty.
pub fn check_tokens<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    missing_vars(&lookup).is_empty()
}

/// Required variables that are absent or blank, in declaration order.
pub fn missing_vars<F>(lookup: &F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_VARS
        .into_iter()
        .filter(|name| lookup(name).is_none_or(|v| v.trim().is_empty()))
        .collect()
}

fn parse_seconds<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(Duration::from_secs(default));
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value: raw.clone() })?;
    if secs == 0 {
        return Err(ConfigError::Validation(format!("{var} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Optional directory for the log file.
pub fn log_dir<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(LOG_DIR)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Process environment first, then values read from the env file.
pub fn env_lookup(env_file: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
    move |key: &str| std::env::var(key).ok().or_else(|| env_file.get(key).cloned())
}

/// Reads `KEY=value` pairs from an env file without touching the process environment.
///
/// A missing file yields an empty map.
pub fn read_env_file<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let to_err = |e| ConfigError::ReadEnvFile { path: path.to_path_buf(), source: e };
    dotenvy::from_path_iter(path)
        .map_err(to_err)?
        .map(|item| item.map_err(to_err))
        .collect()
}

impl Config {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = missing_vars(&lookup);
        if !missing.is_empty() {
            return Err(ConfigError::MissingVar(missing));
        }
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .ok_or(ConfigError::MissingVar(vec![name]))
        };

        let practicum_token = required(PRACTICUM_TOKEN)?;
        let telegram_token = required(TELEGRAM_TOKEN)?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(format!(
                "{TELEGRAM_TOKEN} appears invalid (expected format: 123456789:ABCdefGHI...)"
            )));
        }

        let raw_chat_id = required(TELEGRAM_CHAT_ID)?;
        let chat_id = raw_chat_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ConfigError::InvalidChatId(raw_chat_id.clone()))?;

        let endpoint = lookup(PRACTICUM_ENDPOINT)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{PRACTICUM_ENDPOINT} must be an http(s) URL, got '{endpoint}'"
            )));
        }

        let retry_period = parse_seconds(&lookup, RETRY_PERIOD_SECONDS, DEFAULT_RETRY_PERIOD_SECONDS)?;
        let request_timeout =
            parse_seconds(&lookup, REQUEST_TIMEOUT_SECONDS, DEFAULT_REQUEST_TIMEOUT_SECONDS)?;

        let log_dir = log_dir(&lookup);

        Ok(Self {
            practicum_token,
            telegram_token,
            chat_id,
            endpoint,
            retry_period,
            request_timeout,
            log_dir,
        })
    }
}
