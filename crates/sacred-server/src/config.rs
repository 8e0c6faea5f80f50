use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_AI_TEMPERATURE: f32 = 0.8;
const DEFAULT_GENERATION_DELAY_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("SACRED_JWT_SECRET is unset or still a placeholder")]
    InsecureJwtSecret,

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("SACRED_AI_URL and SACRED_AI_KEY must be set together")]
    PartialAiConfig,
}

/// Completion endpoint settings; present only when both URL and key are set.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub generation_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_secret: Option<String>,
    pub admin_emails: Vec<String>,
    pub ai: Option<AiConfig>,
    pub notify: Option<NotifyConfig>,
}

impl Config {
    /// Reads `SACRED_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("SACRED_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let host = var("SACRED_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(var("SACRED_PORT"), "SACRED_PORT", 3000u16)?;
        let db_path = var("SACRED_DB_PATH")
            .unwrap_or_else(|| "sacred-greeks.db".into())
            .into();

        let admin_emails = var("SACRED_ADMIN_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_ascii_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let ai = match (var("SACRED_AI_URL"), var("SACRED_AI_KEY")) {
            (Some(url), Some(api_key)) => Some(AiConfig {
                url,
                api_key,
                model: var("SACRED_AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.into()),
                temperature: parse_or(
                    var("SACRED_AI_TEMPERATURE"),
                    "SACRED_AI_TEMPERATURE",
                    DEFAULT_AI_TEMPERATURE,
                )?,
                generation_delay: Duration::from_millis(parse_or(
                    var("SACRED_GENERATION_DELAY_MS"),
                    "SACRED_GENERATION_DELAY_MS",
                    DEFAULT_GENERATION_DELAY_MS,
                )?),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAiConfig),
        };

        let notify = var("SACRED_NOTIFY_URL").map(|url| NotifyConfig {
            url,
            token: var("SACRED_NOTIFY_TOKEN"),
        });

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            admin_secret: var("SACRED_ADMIN_SECRET"),
            admin_emails,
            ai,
            notify,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = format!("{}:{}", self.host, self.port);
        value.parse().map_err(|_| ConfigError::Invalid {
            var: "SACRED_HOST",
            value,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { var, value: v }),
        None => Ok(default),
    }
}
