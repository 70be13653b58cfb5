// src/config.rs

use std::{env, fmt, net::SocketAddr, time::Duration};

use dotenvy::dotenv;
use url::Url;

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_REPORT_TITLE: &str = "English Test Result";

/// Process settings read once at startup.
///
/// Bot credentials are not part of it; they are fetched on every request
/// through a [`CredentialsProvider`].
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub log_dir: String,
    pub telegram_api_base: Url,
    pub notify_timeout: Duration,
    pub report_title: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, reason } => write!(f, "invalid {}: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "HOST/PORT",
                reason: e.to_string(),
            })?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let telegram_api_base = parse_api_base(
            &env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_BASE.to_string()),
        )?;

        let timeout_secs = match env::var("NOTIFY_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "NOTIFY_TIMEOUT_SECS",
                    reason: format!("expected a positive integer, got '{}'", raw),
                })?,
            Err(_) => 5,
        };

        let report_title =
            env::var("REPORT_TITLE").unwrap_or_else(|_| DEFAULT_REPORT_TITLE.to_string());

        Ok(Self {
            bind_addr,
            rust_log,
            log_dir,
            telegram_api_base,
            notify_timeout: Duration::from_secs(timeout_secs),
            report_title,
        })
    }
}

/// Parses the Bot API base URL; it must be able to carry path segments.
pub fn parse_api_base(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key: "TELEGRAM_API_BASE",
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid {
            key: "TELEGRAM_API_BASE",
            reason: format!("'{}' cannot be used as a base URL", raw),
        });
    }
    Ok(url)
}

/// Bot token plus destination chat.
#[derive(Clone, PartialEq, Eq)]
pub struct NotificationCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl NotificationCredentials {
    /// Builds credentials when both parts are non-blank.
    pub fn from_parts(bot_token: Option<String>, chat_id: Option<String>) -> Option<Self> {
        let bot_token = bot_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let chat_id = chat_id.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())?;
        Some(Self { bot_token, chat_id })
    }
}

// Keeps the token out of logs.
impl fmt::Debug for NotificationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCredentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Source of notification credentials, consulted once per request.
///
/// `None` means "not configured", which is a normal operating state.
pub trait CredentialsProvider: Send + Sync {
    fn credentials(&self) -> Option<NotificationCredentials>;
}

/// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn credentials(&self) -> Option<NotificationCredentials> {
        NotificationCredentials::from_parts(
            env::var("TELEGRAM_BOT_TOKEN").ok(),
            env::var("TELEGRAM_CHAT_ID").ok(),
        )
    }
}

/// Fixed credentials, mostly for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<NotificationCredentials>);

impl StaticCredentials {
    pub fn new(bot_token: Option<&str>, chat_id: Option<&str>) -> Self {
        Self(NotificationCredentials::from_parts(
            bot_token.map(str::to_string),
            chat_id.map(str::to_string),
        ))
    }
}

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self) -> Option<NotificationCredentials> {
        self.0.clone()
    }
}
